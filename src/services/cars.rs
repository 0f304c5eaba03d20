//! Car operations and the car/garage relationship.
//!
//! Every read and write here is scoped to the authenticated owner; a car
//! belonging to someone else is indistinguishable from a missing one
//! (except on the relationship endpoints, which report Forbidden once
//! both entities are known to exist).

use serde::Serialize;

use super::NO_MORE_RESULTS;
use crate::error::ApiError;
use crate::store::docs::{CarDoc, CarKey, GarageDoc, GarageKey, OwnerRef};
use crate::store::{Datastore, Document, Kind, Predicate};

const NO_CAR_FOR_USER: &str = "No car with this car_id exists for the authenticated user";
const EITHER_MISSING: &str = "Either no car with this car_id or garage with this garage_id exists";
const NOT_OWNER: &str = "This car does not belong to the authenticated user";

#[derive(Debug, Serialize)]
pub struct GarageLink {
    pub id: i64,
    #[serde(rename = "self")]
    pub self_url: String,
}

#[derive(Debug, Serialize)]
pub struct CarResource {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub color: String,
    pub owner: OwnerRef,
    pub garage: Option<GarageLink>,
    #[serde(rename = "self")]
    pub self_url: String,
}

#[derive(Debug, Serialize)]
pub struct CarPage {
    pub results: usize,
    pub cars: Vec<CarResource>,
    /// Absolute URL of the next page, or [`NO_MORE_RESULTS`].
    pub next: String,
}

#[derive(Debug)]
pub struct NewCar {
    pub make: String,
    pub model: String,
    pub color: String,
}

#[derive(Debug, Default)]
pub struct CarPatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
}

fn shape(base: &str, id: i64, doc: CarDoc) -> CarResource {
    CarResource {
        id,
        make: doc.make,
        model: doc.model,
        color: doc.color,
        owner: doc.owner,
        garage: doc.garage.map(|g| GarageLink {
            id: g.id,
            self_url: format!("{}/garages/{}", base, g.id),
        }),
        self_url: format!("{}/cars/{}", base, id),
    }
}

fn apply_patch(doc: &mut CarDoc, patch: CarPatch) {
    if let Some(make) = patch.make {
        doc.make = make;
    }
    if let Some(model) = patch.model {
        doc.model = model;
    }
    if let Some(color) = patch.color {
        doc.color = color;
    }
}

/// Fetches a car visible to `subject`. Existence and ownership collapse
/// into one NotFound so callers cannot probe other owners' cars.
async fn owned_car(
    store: &Datastore,
    subject: &str,
    car_id: i64,
) -> Result<Document<CarDoc>, ApiError> {
    store
        .fetch::<CarDoc>(Kind::Car, car_id)
        .await?
        .filter(|car| car.doc.owner.user_id == subject)
        .ok_or_else(|| ApiError::not_found(NO_CAR_FOR_USER))
}

/// Creates a car owned by the authenticated subject, ungaraged.
pub async fn create_car(
    store: &Datastore,
    base: &str,
    subject: &str,
    new: NewCar,
) -> Result<CarResource, ApiError> {
    let doc = CarDoc {
        make: new.make,
        model: new.model,
        color: new.color,
        owner: OwnerRef { user_id: subject.to_string() },
        garage: None,
    };
    let id = store.insert(Kind::Car, &doc).await?;
    Ok(shape(base, id, doc))
}

/// One page of the subject's cars.
pub async fn list_cars(
    store: &Datastore,
    base: &str,
    subject: &str,
    cursor: Option<&str>,
) -> Result<CarPage, ApiError> {
    let predicate = Predicate::eq(&["owner", "user_id"], subject);
    let page = store
        .list_page::<CarDoc>(Kind::Car, Some(&predicate), cursor)
        .await?;

    let cars: Vec<CarResource> = page
        .items
        .into_iter()
        .map(|car| shape(base, car.id, car.doc))
        .collect();

    let next = match page.next {
        Some(token) => format!("{}/cars/page/{}", base, token),
        None => NO_MORE_RESULTS.to_string(),
    };

    Ok(CarPage { results: cars.len(), cars, next })
}

pub async fn get_car(
    store: &Datastore,
    base: &str,
    subject: &str,
    car_id: i64,
) -> Result<CarResource, ApiError> {
    let car = owned_car(store, subject, car_id).await?;
    Ok(shape(base, car.id, car.doc))
}

/// Applies a partial update to make/model/color. Absent fields are left
/// unmodified; the field whitelist is enforced before this is reached.
pub async fn update_car(
    store: &Datastore,
    base: &str,
    subject: &str,
    car_id: i64,
    patch: CarPatch,
) -> Result<CarResource, ApiError> {
    let mut car = owned_car(store, subject, car_id).await?;
    apply_patch(&mut car.doc, patch);
    store.replace(Kind::Car, car.id, &car.doc).await?;
    Ok(shape(base, car.id, car.doc))
}

/// Deletes a car, refused while it sits in a garage.
pub async fn delete_car(store: &Datastore, subject: &str, car_id: i64) -> Result<(), ApiError> {
    let car = owned_car(store, subject, car_id).await?;
    if car.doc.garage.is_some() {
        return Err(ApiError::conflict("Cannot delete a car that is in a garage"));
    }
    store.remove(Kind::Car, car.id).await?;
    Ok(())
}

/// Check order: existence (handled by callers), then ownership, then
/// garaged state. A garaged car rejects assignment regardless of target.
fn assign_checks(car: &CarDoc, subject: &str) -> Result<(), ApiError> {
    if car.owner.user_id != subject {
        return Err(ApiError::forbidden(NOT_OWNER));
    }
    if car.garage.is_some() {
        return Err(ApiError::conflict("This car is already in a garage"));
    }
    Ok(())
}

/// Same ordering in reverse; removal from a garage the car is not in
/// (including "garaged elsewhere") is a conflict, not a miss.
fn remove_checks(car: &CarDoc, subject: &str, garage_id: i64) -> Result<(), ApiError> {
    if car.owner.user_id != subject {
        return Err(ApiError::forbidden(NOT_OWNER));
    }
    match car.garage {
        Some(current) if current.id == garage_id => Ok(()),
        _ => Err(ApiError::conflict("This car is not in this garage")),
    }
}

/// Puts a car into a garage, updating both sides of the relationship in
/// one store transaction. The checks run against row-locked snapshots,
/// so two concurrent assignments of the same car serialize and the
/// second sees the first one's garage.
pub async fn assign_to_garage(
    store: &Datastore,
    subject: &str,
    car_id: i64,
    garage_id: i64,
) -> Result<(), ApiError> {
    store
        .update_pair_locked(
            (Kind::Car, car_id),
            (Kind::Garage, garage_id),
            |car: Option<Document<CarDoc>>, garage: Option<Document<GarageDoc>>| {
                let (Some(mut car), Some(mut garage)) = (car, garage) else {
                    return Err(ApiError::not_found(EITHER_MISSING));
                };
                assign_checks(&car.doc, subject)?;
                car.doc.garage = Some(GarageKey { id: garage.id });
                garage.doc.cars.push(CarKey { id: car.id });
                Ok((car, garage))
            },
        )
        .await??;
    Ok(())
}

/// Takes a car out of the named garage, updating both sides atomically
/// under the same row locks as assignment.
pub async fn remove_from_garage(
    store: &Datastore,
    subject: &str,
    car_id: i64,
    garage_id: i64,
) -> Result<(), ApiError> {
    store
        .update_pair_locked(
            (Kind::Car, car_id),
            (Kind::Garage, garage_id),
            |car: Option<Document<CarDoc>>, garage: Option<Document<GarageDoc>>| {
                let (Some(mut car), Some(mut garage)) = (car, garage) else {
                    return Err(ApiError::not_found(EITHER_MISSING));
                };
                remove_checks(&car.doc, subject, garage_id)?;
                car.doc.garage = None;
                garage.doc.cars.retain(|entry| entry.id != car.id);
                Ok((car, garage))
            },
        )
        .await??;
    Ok(())
}
