use serde_json::Value;

use crate::server::dto::ProductPayload;
use crate::server::response::{HandlerError, StoreResultExt, ValidationError};
use crate::store::Store;
use crate::types::ProductDraft;

/// Checks a product payload field by field and resolves it into a draft.
/// Runs before any lock is taken or transaction opened; a failure here never
/// touches product state.
pub fn validate_product_payload(
    store: &dyn Store,
    payload: &ProductPayload,
) -> Result<ProductDraft, HandlerError> {
    let mut errors = ValidationError::new();

    let name = match required_string(&payload.name) {
        Field::Ok(name) if !name.trim().is_empty() => Some(name),
        Field::Ok(_) | Field::Missing => {
            errors.add("name", "The name field is required.");
            None
        }
        Field::WrongType => {
            errors.add("name", "The name field must be a string.");
            None
        }
    };

    let category_id = match required_integer(&payload.category_id) {
        Field::Ok(id) => Some(id),
        Field::Missing => {
            errors.add("category_id", "The category id field is required.");
            None
        }
        Field::WrongType => {
            errors.add("category_id", "The category id field must be an integer.");
            None
        }
    };

    // Foreign key must resolve at write time
    if let Some(id) = category_id {
        let exists = store
            .get_category(id)
            .api_err("Failed to check category")?
            .is_some();
        if !exists {
            errors.add("category_id", "The selected category id is invalid.");
        }
    }

    let description = match &payload.description {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add("description", "The description field must be a string.");
            None
        }
    };

    let price = match required_number(&payload.price) {
        Field::Ok(price) => Some(price),
        Field::Missing => {
            errors.add("price", "The price field is required.");
            None
        }
        Field::WrongType => {
            errors.add("price", "The price field must be a number.");
            None
        }
    };

    let stock = match required_integer(&payload.stock) {
        Field::Ok(stock) if stock >= 1 => Some(stock),
        Field::Ok(_) => {
            errors.add("stock", "The stock field must be at least 1.");
            None
        }
        Field::Missing => {
            errors.add("stock", "The stock field is required.");
            None
        }
        Field::WrongType => {
            errors.add("stock", "The stock field must be an integer.");
            None
        }
    };

    let enabled = match &payload.enabled {
        Some(Value::Bool(enabled)) => Some(*enabled),
        None | Some(Value::Null) => {
            errors.add("enabled", "The enabled field is required.");
            None
        }
        Some(_) => {
            errors.add("enabled", "The enabled field must be true or false.");
            None
        }
    };

    errors.into_result()?;

    // Every field is Some once the error list is empty
    Ok(ProductDraft {
        name: name.unwrap(),
        category_id: category_id.unwrap(),
        description,
        price: price.unwrap(),
        stock: stock.unwrap(),
        enabled: enabled.unwrap(),
    })
}

/// The optional `category` list filter must name an existing category.
pub fn validate_category_filter(
    store: &dyn Store,
    category: Option<&str>,
) -> Result<(), HandlerError> {
    if let Some(name) = category {
        let exists = store
            .get_category_by_name(name)
            .api_err("Failed to check category")?
            .is_some();
        if !exists {
            return Err(ValidationError::single("category", "The selected category is invalid.").into());
        }
    }
    Ok(())
}

/// Bulk delete ids must be non-empty and each must reference an active product.
pub fn validate_bulk_ids(store: &dyn Store, ids: &[i64]) -> Result<(), HandlerError> {
    if ids.is_empty() {
        return Err(ValidationError::single("ids", "The ids field is required.").into());
    }

    let existing = store
        .filter_existing_product_ids(ids)
        .api_err("Failed to check products")?;

    let mut errors = ValidationError::new();
    for (position, id) in ids.iter().enumerate() {
        if !existing.contains(id) {
            errors.add(
                format!("ids.{position}"),
                format!("The selected ids.{position} is invalid."),
            );
        }
    }
    errors.into_result()?;
    Ok(())
}

enum Field<T> {
    Ok(T),
    Missing,
    WrongType,
}

fn required_string(value: &Option<Value>) -> Field<String> {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::String(s)) => Field::Ok(s.clone()),
        Some(_) => Field::WrongType,
    }
}

fn required_integer(value: &Option<Value>) -> Field<i64> {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Field::Ok(i),
            None => Field::WrongType,
        },
        Some(_) => Field::WrongType,
    }
}

fn required_number(value: &Option<Value>) -> Field<f64> {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.is_finite() => Field::Ok(f),
            _ => Field::WrongType,
        },
        Some(_) => Field::WrongType,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use serde_json::json;

    fn store_with_category() -> (tempfile::TempDir, SqliteStore, i64) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let food = store.upsert_category("food").unwrap();
        (dir, store, food.id)
    }

    fn payload(category_id: i64) -> ProductPayload {
        ProductPayload {
            name: Some(json!("Nasi Lemak")),
            category_id: Some(json!(category_id)),
            description: Some(json!("coconut rice")),
            price: Some(json!(4.5)),
            stock: Some(json!(2)),
            enabled: Some(json!(true)),
        }
    }

    #[test]
    fn valid_payload_resolves_to_draft() {
        let (_dir, store, food_id) = store_with_category();
        let draft = validate_product_payload(&store, &payload(food_id)).unwrap();
        assert_eq!(draft.name, "Nasi Lemak");
        assert_eq!(draft.category_id, food_id);
        assert_eq!(draft.description.as_deref(), Some("coconut rice"));
        assert_eq!(draft.price, 4.5);
        assert_eq!(draft.stock, 2);
        assert!(draft.enabled);
    }

    #[test]
    fn nonexistent_category_names_the_field() {
        let (_dir, store, _food_id) = store_with_category();
        let result = validate_product_payload(&store, &payload(-1));
        match result {
            Err(HandlerError::Validation(_)) => {}
            _ => panic!("expected a validation error"),
        }
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let (_dir, store, _food_id) = store_with_category();
        let result = validate_product_payload(&store, &ProductPayload::default());
        assert!(matches!(result, Err(HandlerError::Validation(_))));
    }

    #[test]
    fn zero_stock_is_rejected() {
        let (_dir, store, food_id) = store_with_category();
        let mut bad = payload(food_id);
        bad.stock = Some(json!(0));
        assert!(matches!(
            validate_product_payload(&store, &bad),
            Err(HandlerError::Validation(_))
        ));
    }

    #[test]
    fn enabled_must_be_a_strict_boolean() {
        let (_dir, store, food_id) = store_with_category();
        let mut bad = payload(food_id);
        bad.enabled = Some(json!("true"));
        assert!(matches!(
            validate_product_payload(&store, &bad),
            Err(HandlerError::Validation(_))
        ));
    }

    #[test]
    fn fractional_stock_is_rejected() {
        let (_dir, store, food_id) = store_with_category();
        let mut bad = payload(food_id);
        bad.stock = Some(json!(1.5));
        assert!(matches!(
            validate_product_payload(&store, &bad),
            Err(HandlerError::Validation(_))
        ));
    }

    #[test]
    fn null_description_is_accepted() {
        let (_dir, store, food_id) = store_with_category();
        let mut ok = payload(food_id);
        ok.description = Some(json!(null));
        let draft = validate_product_payload(&store, &ok).unwrap();
        assert!(draft.description.is_none());
    }

    #[test]
    fn category_filter_must_exist() {
        let (_dir, store, _food_id) = store_with_category();
        assert!(validate_category_filter(&store, None).is_ok());
        assert!(validate_category_filter(&store, Some("food")).is_ok());
        assert!(matches!(
            validate_category_filter(&store, Some("desert")),
            Err(HandlerError::Validation(_))
        ));
    }

    #[test]
    fn bulk_ids_must_exist_and_be_nonempty() {
        let (_dir, store, food_id) = store_with_category();
        let product = store
            .upsert_product(&crate::types::ProductDraft {
                name: "a".to_string(),
                category_id: food_id,
                description: None,
                price: 1.0,
                stock: 1,
                enabled: true,
            })
            .unwrap();

        assert!(validate_bulk_ids(&store, &[product.id]).is_ok());
        assert!(matches!(
            validate_bulk_ids(&store, &[]),
            Err(HandlerError::Validation(_))
        ));
        assert!(matches!(
            validate_bulk_ids(&store, &[product.id, 999]),
            Err(HandlerError::Validation(_))
        ));
    }
}
