use super::*;

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

fn invalid_messages(result: Result<HomeInput, HomeError>) -> Vec<String> {
    match result {
        Err(HomeError::Invalid(errors)) => errors,
        other => panic!("expected invalid, got {other:?}"),
    }
}

#[test]
fn parses_complete_form() {
    let input = HomeInput::from_fields(&fields(&[
        ("house_name", " Seaside Villa "),
        ("price", "120.5"),
        ("location", "Goa"),
        ("rating", "4.5"),
        ("description", "Near the beach"),
    ]))
    .unwrap();

    assert_eq!(input.house_name, "Seaside Villa");
    assert!((input.price - 120.5).abs() < f64::EPSILON);
    assert_eq!(input.location, "Goa");
    assert!((input.rating - 4.5).abs() < f64::EPSILON);
    assert_eq!(input.description, "Near the beach");
}

#[test]
fn missing_rating_and_description_default() {
    let input =
        HomeInput::from_fields(&fields(&[("house_name", "Cabin"), ("price", "80"), ("location", "Alps")])).unwrap();
    assert!(input.rating.abs() < f64::EPSILON);
    assert!(input.description.is_empty());
}

#[test]
fn empty_form_reports_required_fields() {
    let errors = invalid_messages(HomeInput::from_fields(&HashMap::new()));
    assert!(errors.iter().any(|e| e.contains("House name")));
    assert!(errors.iter().any(|e| e.contains("Location")));
    assert!(errors.iter().any(|e| e.contains("Price")));
    assert_eq!(errors.len(), 3);
}

#[test]
fn rejects_negative_and_non_numeric_price() {
    for price in ["-1", "cheap", "NaN", "inf"] {
        let errors = invalid_messages(HomeInput::from_fields(&fields(&[
            ("house_name", "Cabin"),
            ("price", price),
            ("location", "Alps"),
        ])));
        assert_eq!(errors, vec!["Price must be a non-negative number".to_owned()], "price {price:?}");
    }
}

#[test]
fn rejects_out_of_range_rating() {
    for rating in ["5.5", "-0.1", "great"] {
        let errors = invalid_messages(HomeInput::from_fields(&fields(&[
            ("house_name", "Cabin"),
            ("price", "10"),
            ("location", "Alps"),
            ("rating", rating),
        ])));
        assert_eq!(errors, vec!["Rating must be between 0 and 5".to_owned()], "rating {rating:?}");
    }
}

#[test]
fn home_error_display() {
    let id = Uuid::nil();
    assert_eq!(HomeError::NotFound(id).to_string(), format!("home not found: {id}"));
    assert_eq!(HomeError::Invalid(vec!["a".into()]).to_string(), "invalid home: a");
}

#[test]
fn home_row_serializes_photo_url() {
    let row = HomeRow {
        id: Uuid::nil(),
        host_id: None,
        house_name: "Cabin".into(),
        price: 80.0,
        location: "Alps".into(),
        rating: 4.0,
        photo: Some("/uploads/abcd1234-cabin.png".into()),
        description: String::new(),
    };
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["photo"], "/uploads/abcd1234-cabin.png");
    assert!(json["host_id"].is_null());
}

// =============================================================================
// LIVE DATABASE
// =============================================================================

#[cfg(feature = "live-db-tests")]
fn sample_input(name: &str) -> HomeInput {
    HomeInput {
        house_name: name.to_owned(),
        price: 120.0,
        location: "Lisbon".into(),
        rating: 4.5,
        description: "Near the river".into(),
    }
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn home_crud_is_scoped_to_host() {
    use crate::state::test_helpers::{integration_pool, seed_user};

    let pool = integration_pool().await;
    let (host_id, _) = seed_user(&pool, "Secret#123").await;
    let (other_id, _) = seed_user(&pool, "Secret#123").await;

    let created = create_home(&pool, host_id, &sample_input("Sea View"), Some("/uploads/a-one.png"))
        .await
        .expect("create_home should succeed");
    assert_eq!(created.host_id, Some(host_id));

    let listed = list_host_homes(&pool, host_id).await.expect("list should succeed");
    assert!(listed.iter().any(|h| h.id == created.id));
    let foreign = list_host_homes(&pool, other_id).await.expect("list should succeed");
    assert!(foreign.iter().all(|h| h.id != created.id));

    assert!(matches!(
        get_host_home(&pool, other_id, created.id).await,
        Err(HomeError::NotFound(id)) if id == created.id
    ));
    assert!(matches!(
        update_home(&pool, other_id, created.id, &sample_input("Hijacked"), None).await,
        Err(HomeError::NotFound(_))
    ));
    assert!(matches!(delete_home(&pool, other_id, created.id).await, Err(HomeError::NotFound(_))));

    let untouched = get_home(&pool, created.id).await.expect("home should still exist");
    assert_eq!(untouched.house_name, "Sea View");
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn update_reports_replaced_photo_only_when_it_changes() {
    use crate::state::test_helpers::{integration_pool, seed_user};

    let pool = integration_pool().await;
    let (host_id, _) = seed_user(&pool, "Secret#123").await;
    let created = create_home(&pool, host_id, &sample_input("Sea View"), Some("/uploads/a-one.png"))
        .await
        .expect("create_home should succeed");

    let kept = update_home(&pool, host_id, created.id, &sample_input("Renamed"), None)
        .await
        .expect("update should succeed");
    assert_eq!(kept.replaced_photo, None);
    assert_eq!(kept.home.house_name, "Renamed");
    assert_eq!(kept.home.photo.as_deref(), Some("/uploads/a-one.png"));

    let swapped = update_home(&pool, host_id, created.id, &sample_input("Renamed"), Some("/uploads/b-two.png"))
        .await
        .expect("update should succeed");
    assert_eq!(swapped.replaced_photo.as_deref(), Some("/uploads/a-one.png"));
    assert_eq!(swapped.home.photo.as_deref(), Some("/uploads/b-two.png"));

    let same = update_home(&pool, host_id, created.id, &sample_input("Renamed"), Some("/uploads/b-two.png"))
        .await
        .expect("update should succeed");
    assert_eq!(same.replaced_photo, None);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn delete_returns_photo_and_removes_row() {
    use crate::state::test_helpers::{integration_pool, seed_user};

    let pool = integration_pool().await;
    let (host_id, _) = seed_user(&pool, "Secret#123").await;
    let with_photo = create_home(&pool, host_id, &sample_input("Sea View"), Some("/uploads/a-one.png"))
        .await
        .expect("create_home should succeed");
    let without_photo = create_home(&pool, host_id, &sample_input("Hill Hut"), None)
        .await
        .expect("create_home should succeed");

    let photo = delete_home(&pool, host_id, with_photo.id).await.expect("delete should succeed");
    assert_eq!(photo.as_deref(), Some("/uploads/a-one.png"));
    assert!(matches!(get_home(&pool, with_photo.id).await, Err(HomeError::NotFound(_))));

    let none = delete_home(&pool, host_id, without_photo.id).await.expect("delete should succeed");
    assert_eq!(none, None);
    assert!(matches!(delete_home(&pool, host_id, without_photo.id).await, Err(HomeError::NotFound(_))));
}
