//! Garage operations. Garages have no ownership concept: any caller may
//! create, read and update them; deletion requires the garage to be
//! empty.

use serde::Serialize;

use super::NO_MORE_RESULTS;
use crate::error::ApiError;
use crate::store::docs::GarageDoc;
use crate::store::{Datastore, Kind};

const NO_SUCH_GARAGE: &str = "No garage with this garage_id exists";

#[derive(Debug, Serialize)]
pub struct CarLink {
    pub id: i64,
    #[serde(rename = "self")]
    pub self_url: String,
}

#[derive(Debug, Serialize)]
pub struct GarageResource {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub cars: Vec<CarLink>,
    #[serde(rename = "self")]
    pub self_url: String,
}

#[derive(Debug, Serialize)]
pub struct GaragePage {
    pub results: usize,
    pub garages: Vec<GarageResource>,
    pub next: String,
}

#[derive(Debug)]
pub struct NewGarage {
    pub name: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Default)]
pub struct GaragePatch {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

fn shape(base: &str, id: i64, doc: GarageDoc) -> GarageResource {
    let cars = doc
        .cars
        .into_iter()
        .map(|entry| CarLink {
            id: entry.id,
            self_url: format!("{}/cars/{}", base, entry.id),
        })
        .collect();
    GarageResource {
        id,
        name: doc.name,
        city: doc.city,
        state: doc.state,
        cars,
        self_url: format!("{}/garages/{}", base, id),
    }
}

fn apply_patch(doc: &mut GarageDoc, patch: GaragePatch) {
    if let Some(name) = patch.name {
        doc.name = name;
    }
    if let Some(city) = patch.city {
        doc.city = city;
    }
    if let Some(state) = patch.state {
        doc.state = state;
    }
}

pub async fn create_garage(
    store: &Datastore,
    base: &str,
    new: NewGarage,
) -> Result<GarageResource, ApiError> {
    let doc = GarageDoc {
        name: new.name,
        city: new.city,
        state: new.state,
        cars: Vec::new(),
    };
    let id = store.insert(Kind::Garage, &doc).await?;
    Ok(shape(base, id, doc))
}

pub async fn list_garages(
    store: &Datastore,
    base: &str,
    cursor: Option<&str>,
) -> Result<GaragePage, ApiError> {
    let page = store.list_page::<GarageDoc>(Kind::Garage, None, cursor).await?;

    let garages: Vec<GarageResource> = page
        .items
        .into_iter()
        .map(|garage| shape(base, garage.id, garage.doc))
        .collect();

    let next = match page.next {
        Some(token) => format!("{}/garages/page/{}", base, token),
        None => NO_MORE_RESULTS.to_string(),
    };

    Ok(GaragePage { results: garages.len(), garages, next })
}

pub async fn get_garage(
    store: &Datastore,
    base: &str,
    garage_id: i64,
) -> Result<GarageResource, ApiError> {
    let garage = store
        .fetch::<GarageDoc>(Kind::Garage, garage_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_SUCH_GARAGE))?;
    Ok(shape(base, garage.id, garage.doc))
}

pub async fn update_garage(
    store: &Datastore,
    base: &str,
    garage_id: i64,
    patch: GaragePatch,
) -> Result<GarageResource, ApiError> {
    let mut garage = store
        .fetch::<GarageDoc>(Kind::Garage, garage_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_SUCH_GARAGE))?;
    apply_patch(&mut garage.doc, patch);
    store.replace(Kind::Garage, garage.id, &garage.doc).await?;
    Ok(shape(base, garage.id, garage.doc))
}

/// Deletes a garage, refused while any car is assigned to it.
pub async fn delete_garage(store: &Datastore, garage_id: i64) -> Result<(), ApiError> {
    let garage = store
        .fetch::<GarageDoc>(Kind::Garage, garage_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_SUCH_GARAGE))?;
    if !garage.doc.cars.is_empty() {
        return Err(ApiError::conflict("Cannot delete a garage that contains cars"));
    }
    store.remove(Kind::Garage, garage.id).await?;
    Ok(())
}
