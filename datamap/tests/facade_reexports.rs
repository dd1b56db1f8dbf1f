use datamap::*;

#[derive(Default)]
struct TitleRequired;

#[async_trait]
impl Validator for TitleRequired {
    async fn validate(&self, validation: &mut Validation<'_>) {
        if !validation.attributes().contains_key("title") {
            validation.push_error("Missing title");
        }
    }
}

#[derive(EntityKind)]
#[entity(validator = TitleRequired, adaptor = IdentityAdaptor)]
struct SundaeTopping;

#[tokio::test]
async fn facade_reexports_and_kind_configuration() {
    // Ensure re-exported traits and macros are usable from the facade crate.
    assert_eq!(SundaeTopping::TABLE, "sundae_toppings");

    let mut topping: Entity<SundaeTopping> = Entity::new(record! { "isCrunchy" => true });
    assert!(!topping.validate().await);
    assert_eq!(topping.errors(), &["Missing title".to_string()]);
    // IdentityAdaptor keeps keys as they are.
    assert!(topping.columns().contains_key("isCrunchy"));

    // Exercise core types through facade.
    let q = Query::new(SundaeTopping::TABLE).filter_eq(ID_COLUMN, 1).count();
    assert_eq!(q.operation(), &Operation::Count);
    let v = vec![
        Value::Null,
        Value::Bool(true),
        Value::I64(2),
        Value::F64(3.0),
        Value::from("a"),
        Value::Bytes(vec![1]),
    ];
    assert_eq!(v.len(), 6);
    assert_eq!(Validity::default(), Validity::Unvalidated);
}
