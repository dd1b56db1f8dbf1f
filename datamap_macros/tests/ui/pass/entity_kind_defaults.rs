use datamap_core::EntityKind;
use datamap_macros::EntityKind;

#[derive(EntityKind)]
struct IceCream;

fn main() {
    // Table is the pluralized snake_case type name.
    assert_eq!(IceCream::TABLE, "ice_creams");
    let _validator: datamap_core::AlwaysValid = IceCream::validator();
    let _adaptor: datamap_core::CaseAdaptor = IceCream::adaptor();
}
