use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::gateway::Store;
use crate::models::{loose_text, NewStudent, Student};
use crate::{proceeds, Error, Payload};

const MISSING_FIELDS: &str = "All fields are required.";

pub async fn register_student(
    payload: Result<Json<CreateStudent>, JsonRejection>,
    Extension(store): Extension<Store>,
) -> Payload<(StatusCode, Json<CreatedStudent>)> {
    let Json(body) = payload.map_err(|rejection| {
        log::debug!("Rejected student payload: {}", rejection);
        Error::invalid(MISSING_FIELDS)
    })?;
    let student = body.validate()?;

    let student_id = store
        .insert_student(&student)
        .await
        .map_err(|err| Error::storage("Failed to add student.", err))?;
    log::info!("Registered student {} ({})", student_id, student.name);

    Ok((
        StatusCode::CREATED,
        Json(CreatedStudent {
            message: "Student added successfully!",
            student_id,
        }),
    ))
}

pub async fn list_students(Extension(store): Extension<Store>) -> Payload<Json<Vec<Student>>> {
    let students = store
        .list_students()
        .await
        .map_err(|err| Error::storage("DB error during SELECT", err))?;
    proceeds(students)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStudent {
    #[serde(default, deserialize_with = "loose_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub race: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub academy: Option<String>,
    #[serde(default, rename = "studentRole", deserialize_with = "loose_text")]
    pub student_role: Option<String>,
}

impl CreateStudent {
    /// Every field except `studentRole` must be present and non-blank.
    /// Values are kept exactly as sent.
    pub fn validate(self) -> Result<NewStudent, Error> {
        fn required(field: Option<String>) -> Result<String, Error> {
            match field {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(Error::invalid(MISSING_FIELDS)),
            }
        }

        Ok(NewStudent {
            name: required(self.name)?,
            weight: required(self.weight)?,
            contact: required(self.contact)?,
            gender: required(self.gender)?,
            race: required(self.race)?,
            academy: required(self.academy)?,
            student_role: self.student_role,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedStudent {
    message: &'static str,
    #[serde(rename = "studentId")]
    student_id: i32,
}
