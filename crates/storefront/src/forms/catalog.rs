//! Store and product forms.

use serde::Deserialize;

use bazaar_core::{Money, MoneyError, StoreId};

use super::{FormErrors, REQUIRED, required_text};
use crate::models::Store;

const NAME_MAX: usize = 200;

/// Store create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreForm {
    pub name: String,
    pub description: String,
}

/// Validated store fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
}

impl StoreForm {
    /// Pre-filled form for editing `store`.
    #[must_use]
    pub fn from_store(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            description: store.description.clone(),
        }
    }

    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] when the name is missing or too long.
    pub fn validate(&self) -> Result<StoreInput, FormErrors> {
        let mut errors = FormErrors::default();
        let name = required_text(&mut errors, "name", &self.name, NAME_MAX);
        errors.into_result(StoreInput {
            name,
            description: self.description.trim().to_owned(),
        })
    }
}

/// Product create/edit form, filled from the multipart body.
///
/// The image part is handled by the route, which stores the file and
/// reports upload problems under the `image` field.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock_quantity: String,
    pub store: String,
}

/// Validated product fields, without the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock_quantity: u32,
    pub store_id: StoreId,
}

impl ProductForm {
    /// Set a text field by its form name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = value,
            "description" => self.description = value,
            "price" => self.price = value,
            "stock_quantity" => self.stock_quantity = value,
            "store" => self.store = value,
            _ => {}
        }
    }

    /// Pre-filled form for editing a product.
    #[must_use]
    pub fn from_product(product: &crate::models::Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.plain(),
            stock_quantity: product.stock_quantity.to_string(),
            store: product.store_id.to_string(),
        }
    }

    /// Validate the form. `stores` are the choices offered to the vendor;
    /// any other store id is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] for each invalid field.
    pub fn validate(&self, stores: &[Store]) -> Result<ProductInput, FormErrors> {
        let mut errors = FormErrors::default();

        let name = required_text(&mut errors, "name", &self.name, NAME_MAX);
        let description = self.description.trim().to_owned();
        if description.is_empty() {
            errors.add("description", REQUIRED);
        }

        let price = parse_price(&mut errors, &self.price);
        let stock_quantity = parse_stock(&mut errors, &self.stock_quantity);
        let store_id = parse_store_choice(&mut errors, &self.store, stores);

        match (price, stock_quantity, store_id) {
            (Some(price), Some(stock_quantity), Some(store_id)) if errors.is_empty() => {
                Ok(ProductInput {
                    name,
                    description,
                    price,
                    stock_quantity,
                    store_id,
                })
            }
            _ => Err(errors),
        }
    }
}

fn parse_price(errors: &mut FormErrors, raw: &str) -> Option<Money> {
    if raw.trim().is_empty() {
        errors.add("price", REQUIRED);
        return None;
    }
    match Money::parse(raw) {
        Ok(price) => Some(price),
        Err(e) => {
            let message = match e {
                MoneyError::NotANumber => "Enter a number.".to_owned(),
                MoneyError::Negative => "Price cannot be negative.".to_owned(),
                MoneyError::TooManyDecimalPlaces { max } => {
                    format!("Ensure that there are no more than {max} decimal places.")
                }
                MoneyError::TooManyDigits { max } => {
                    format!("Ensure that there are no more than {max} digits in total.")
                }
            };
            errors.add("price", message);
            None
        }
    }
}

fn parse_stock(errors: &mut FormErrors, raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("stock_quantity", REQUIRED);
        return None;
    }
    let Ok(value) = raw.parse::<i64>() else {
        errors.add("stock_quantity", "Enter a whole number.");
        return None;
    };
    if value < 0 {
        errors.add("stock_quantity", "Stock quantity cannot be negative.");
        return None;
    }
    if value > i64::from(i32::MAX) {
        errors.add(
            "stock_quantity",
            format!("Ensure this value is less than or equal to {}.", i32::MAX),
        );
        return None;
    }
    u32::try_from(value).ok()
}

fn parse_store_choice(errors: &mut FormErrors, raw: &str, stores: &[Store]) -> Option<StoreId> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("store", REQUIRED);
        return None;
    }
    let chosen = raw
        .parse::<StoreId>()
        .ok()
        .filter(|id| stores.iter().any(|s| s.id == *id));
    if chosen.is_none() {
        errors.add(
            "store",
            "Select a valid choice. That choice is not one of the available choices.",
        );
    }
    chosen
}

/// An entry in the store selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOption {
    pub id: StoreId,
    pub name: String,
    pub selected: bool,
}

/// Selector entries for `stores`, marking the one whose id matches
/// `selected` (the raw form value).
#[must_use]
pub fn store_options(stores: &[Store], selected: &str) -> Vec<StoreOption> {
    let selected = selected.trim().parse::<StoreId>().ok();
    stores
        .iter()
        .map(|store| StoreOption {
            id: store.id,
            name: store.name.clone(),
            selected: Some(store.id) == selected,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use bazaar_core::UserId;

    use super::*;

    fn store(id: i32, name: &str) -> Store {
        Store {
            id: StoreId::new(id),
            name: name.to_owned(),
            description: String::new(),
            vendor_id: UserId::new(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product_form() -> ProductForm {
        ProductForm {
            name: "Teapot".to_owned(),
            description: "Short and stout".to_owned(),
            price: "24.5".to_owned(),
            stock_quantity: "3".to_owned(),
            store: "7".to_owned(),
        }
    }

    #[test]
    fn test_store_form() {
        let form = StoreForm {
            name: " Kettle Corner ".to_owned(),
            description: "Teapots".to_owned(),
        };
        assert_eq!(form.validate().expect("valid").name, "Kettle Corner");

        let errors = StoreForm::default().validate().expect_err("missing name");
        assert_eq!(errors.field("name"), [REQUIRED]);

        let long = StoreForm {
            name: "x".repeat(201),
            description: String::new(),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_product_form_valid() {
        let input = product_form()
            .validate(&[store(7, "Mine")])
            .expect("valid product");
        assert_eq!(input.price.to_string(), "$24.50");
        assert_eq!(input.stock_quantity, 3);
        assert_eq!(input.store_id, StoreId::new(7));
    }

    #[test]
    fn test_product_form_rejects_foreign_store() {
        let errors = product_form()
            .validate(&[store(8, "Mine")])
            .expect_err("foreign store");
        assert_eq!(
            errors.field("store"),
            ["Select a valid choice. That choice is not one of the available choices."]
        );
    }

    #[test]
    fn test_product_form_number_errors() {
        let mut form = product_form();
        form.price = "-1".to_owned();
        form.stock_quantity = "-2".to_owned();
        let errors = form.validate(&[store(7, "Mine")]).expect_err("negative values");
        assert_eq!(errors.field("price"), ["Price cannot be negative."]);
        assert_eq!(errors.field("stock_quantity"), ["Stock quantity cannot be negative."]);

        form.price = "1.999".to_owned();
        form.stock_quantity = "many".to_owned();
        let errors = form.validate(&[store(7, "Mine")]).expect_err("bad numbers");
        assert_eq!(
            errors.field("price"),
            ["Ensure that there are no more than 2 decimal places."]
        );
        assert_eq!(errors.field("stock_quantity"), ["Enter a whole number."]);
    }

    #[test]
    fn test_product_form_set_ignores_unknown_fields() {
        let mut form = ProductForm::default();
        form.set("name", "Mug".to_owned());
        form.set("image", "ignored".to_owned());
        assert_eq!(form.name, "Mug");
    }

    #[test]
    fn test_store_options_marks_selection() {
        let stores = [store(1, "A"), store(2, "B")];
        let options = store_options(&stores, "2");
        assert!(!options[0].selected);
        assert!(options[1].selected);
        assert!(store_options(&stores, "").iter().all(|o| !o.selected));
    }
}
