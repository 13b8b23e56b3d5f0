use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

use crate::api::AppState;
use crate::domain::aggregates::{Product, ProductDraft};
use crate::domain::catalog::{self, ListParams, PaginatedResponse};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Money;
use crate::{Result, StoreError};

pub async fn list_public(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    // Custom services are quoted to one customer and stay out of the catalog.
    let products: Vec<Product> = s.repo.list_products().await?.into_iter().filter(|p| !p.is_custom).collect();
    Ok(Json(catalog::browse(&products, &p)))
}

pub async fn get_public(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Product>> {
    let product = s.repo.get_product(id).await?.ok_or(StoreError::ProductNotFound(id))?;
    Ok(Json(product.public_view()))
}

pub async fn list_admin(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.repo.list_products().await?))
}

pub async fn create_product(State(s): State<AppState>, Json(draft): Json<ProductDraft>) -> Result<(StatusCode, Json<Product>)> {
    let draft = draft.normalized();
    draft.validate()?;
    let product = s.repo.create_product(draft).await?;
    tracing::info!(product_id = product.id, title = %product.title, "product created");
    s.events.publish(DomainEvent::product_created(&product)).await;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(s): State<AppState>, Path(id): Path<i64>, Json(draft): Json<ProductDraft>) -> Result<Json<Product>> {
    let draft = draft.normalized();
    draft.validate()?;
    let product = s.repo.update_product(id, draft).await?.ok_or(StoreError::ProductNotFound(id))?;
    s.events.publish(DomainEvent::Product(ProductEvent::Updated { product_id: id })).await;
    Ok(Json(product))
}

pub async fn delete_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    if !s.repo.delete_product(id).await? { return Err(StoreError::ProductNotFound(id)); }
    tracing::info!(product_id = id, "product deleted");
    s.events.publish(DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
    Ok(StatusCode::NO_CONTENT)
}

fn positive_price(price: &Money) -> std::result::Result<(), ValidationError> {
    if price.is_negative() || price.is_zero() { return Err(ValidationError::new("price_must_be_positive")); }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomServiceRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(custom = "positive_price")]
    pub price: Money,
}

pub async fn create_custom_service(State(s): State<AppState>, Json(r): Json<CustomServiceRequest>) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    let draft = ProductDraft::custom_service(r.title, r.description, r.price.round_cents()).normalized();
    let product = s.repo.create_product(draft).await?;
    tracing::info!(product_id = product.id, price = %product.price, "custom service created");
    s.events.publish(DomainEvent::product_created(&product)).await;
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EnhanceRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub async fn enhance_service(State(s): State<AppState>, Json(r): Json<EnhanceRequest>) -> Result<Json<Value>> {
    r.validate()?;
    let description = s.ai()?.enhance_description(r.title.trim(), r.description.trim()).await?;
    Ok(Json(json!({ "description": description })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use crate::domain::aggregates::Product;
    use crate::domain::events::{DomainEvent, ProductEvent};
    use crate::domain::value_objects::Money;
    use crate::repository::Repository;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_public_listing_hides_cost() {
        let app = app().await;
        let (status, body) = json(app.send(Method::GET, "/api/products?sort=price_desc", None, false).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["data"][0]["title"], "Epson Projector");
        assert!(body["data"].as_array().unwrap().iter().all(|p| p.get("cost").is_none()));

        let (_, admin) = json(app.send(Method::GET, "/api/admin/products", None, true).await).await;
        assert!(admin[0].get("cost").is_some());
    }

    #[tokio::test]
    async fn test_category_filter() {
        let app = app().await;
        let (_, body) = json(app.send(Method::GET, "/api/products?category=audio%20gear", None, false).await).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["title"], "Shure SM58");
    }

    #[tokio::test]
    async fn test_product_crud() {
        let app = app().await;
        let draft = json!({ "title": "  Mixer  ", "price": "799.00", "category": "Audio Gear/Mixers" });
        let (status, created) = json(app.send(Method::POST, "/api/admin/products", Some(draft), true).await).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Product = serde_json::from_value(created).unwrap();
        assert_eq!(created.title, "Mixer");

        let update = json!({ "title": "Mixer 16ch", "price": "899.00", "category": "Audio Gear/Mixers" });
        let uri = format!("/api/admin/products/{}", created.id);
        let (status, updated) = json(app.send(Method::PUT, &uri, Some(update), true).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Mixer 16ch");

        assert_eq!(app.send(Method::DELETE, &uri, None, true).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(app.send(Method::DELETE, &uri, None, true).await.status(), StatusCode::NOT_FOUND);
        let events = app.state.events.recorded();
        assert!(events.contains(&DomainEvent::Product(ProductEvent::Deleted { product_id: created.id })));
    }

    #[tokio::test]
    async fn test_sub_cent_price_rejected_on_create_and_update() {
        let app = app().await;
        let draft = json!({ "title": "DI box", "price": "19.999", "category": "Audio Gear/DI" });
        let (status, body) = json(app.send(Method::POST, "/api/admin/products", Some(draft), true).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].get("price").is_some());
        assert_eq!(app.repo.list_products().await.unwrap().len(), 3);

        let update = json!({ "title": "Shure SM58", "price": "100.00", "our_price": "89.995", "category": "Audio Gear/Mics" });
        let (status, body) = json(app.send(Method::PUT, "/api/admin/products/1", Some(update), true).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].get("our_price").is_some());
        let stored = app.repo.get_product(1).await.unwrap().unwrap();
        assert_eq!(stored.price, Money::dollars(100));
        assert_eq!(stored.our_price, None);
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let app = app().await;
        let draft = json!({ "title": "", "price": "-5", "category": "" });
        let (status, body) = json(app.send(Method::POST, "/api/admin/products", Some(draft), true).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].get("title").is_some());
        assert!(body["details"].get("price").is_some());
    }

    #[tokio::test]
    async fn test_custom_service_is_tax_exempt_and_unlisted() {
        let app = app().await;
        let req = json!({ "title": "Choir miking consult", "description": "On-site visit", "price": 150 });
        let (status, body) = json(app.send(Method::POST, "/api/custom-services", Some(req), false).await).await;
        assert_eq!(status, StatusCode::CREATED);
        let product: Product = serde_json::from_value(body).unwrap();
        assert!(product.is_custom && product.is_service && product.is_tax_exempt());
        assert_eq!(product.category.as_str(), "Services/Custom");
        assert_eq!(app.repo.get_product(product.id).await.unwrap().unwrap().price, Money::dollars(150));

        let (_, listing) = json(app.send(Method::GET, "/api/products", None, false).await).await;
        assert_eq!(listing["total"], 3);

        let zero = json!({ "title": "Free", "price": 0 });
        assert_eq!(app.send(Method::POST, "/api/custom-services", Some(zero), false).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enhance_service_uses_generator() {
        let app = app().await;
        let req = json!({ "title": "Stage wiring", "description": "we wire stages" });
        let (status, body) = json(app.send(Method::POST, "/api/admin/enhance-service", Some(req), true).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Stage wiring, done right.");
    }
}
