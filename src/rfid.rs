use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::gateway::Store;
use crate::ledger;
use crate::models::{loose_text, ScanRecord};
use crate::{proceeds, Error, Payload};

const MISSING_TAG: &str = "tag_id is required in request body.";

/// Opens or closes a race log for the scanned tag, stamped with server time.
pub async fn record_scan(
    payload: Result<Json<ScanTag>, JsonRejection>,
    Extension(store): Extension<Store>,
) -> Payload<&'static str> {
    let Json(body) = payload.map_err(|rejection| {
        log::debug!("Rejected scan payload: {}", rejection);
        Error::invalid(MISSING_TAG)
    })?;
    let tag_id = body.tag_id.ok_or_else(|| Error::invalid(MISSING_TAG))?;

    let outcome = ledger::record_scan(store.as_ref(), &tag_id, Utc::now()).await?;
    Ok(outcome.confirmation())
}

pub async fn list_scans(Extension(store): Extension<Store>) -> Payload<Json<Vec<ScanRecord>>> {
    let scans = store
        .list_scans()
        .await
        .map_err(|err| Error::storage("DB error during SELECT", err))?;
    proceeds(scans)
}

pub async fn read_scan(
    Path(id): Path<String>,
    Extension(store): Extension<Store>,
) -> Payload<Json<ScanRecord>> {
    // non-numeric ids cannot match a row
    let id = match id.parse::<i32>() {
        Ok(id) => id,
        Err(_) => return Err(Error::not_found("Race log not found")),
    };

    let scan = store
        .get_scan(id)
        .await
        .map_err(|err| Error::storage("DB error during SELECT", err))?;
    match scan {
        Some(scan) => proceeds(scan),
        None => Err(Error::not_found("Race log not found")),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanTag {
    #[serde(default, deserialize_with = "loose_text")]
    pub tag_id: Option<String>,
}
