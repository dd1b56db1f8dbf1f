use datamap_core::{async_trait, EntityKind, IdentityAdaptor, Validation, Validator};
use datamap_macros::EntityKind;

#[derive(Default)]
struct NameRequired;

#[async_trait]
impl Validator for NameRequired {
    async fn validate(&self, validation: &mut Validation<'_>) {
        validation.require("name", "Missing name");
    }
}

#[derive(EntityKind)]
#[entity(table = "desserts", validator = NameRequired, adaptor = IdentityAdaptor)]
struct Dessert;

fn main() {
    assert_eq!(Dessert::TABLE, "desserts");
    let _validator: NameRequired = Dessert::validator();
    let _adaptor: IdentityAdaptor = Dessert::adaptor();
}
