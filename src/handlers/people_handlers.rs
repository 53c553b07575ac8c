use axum::extract::State;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::dto::{BirthdaysQuery, CreatePersonDto, PersonView, UpdatePersonDto};
use crate::errors::ApiError;
use crate::extract::{Json, Path, Query};
use crate::repo;
use crate::views::{self, UpcomingBirthday};

/// Handler for listing people, alphabetically
///
/// This function handles GET requests to `/people`.
#[instrument(skip(pool, user))]
pub async fn list_people_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
) -> Result<Json<Vec<PersonView>>, ApiError> {
    let today = Utc::now().date_naive();
    let people = repo::list_people(&pool, &user.user_id).map_err(ApiError::Database)?;

    debug!("Retrieved {} people", people.len());
    Ok(Json(people.into_iter().map(|p| PersonView::new(p, today)).collect()))
}

/// Handler for adding a person
///
/// This function handles POST requests to `/people`.
///
/// ### Returns
///
/// The created person with zodiac sign and age as JSON
#[instrument(skip(pool, user, payload), fields(name = %payload.name))]
pub async fn create_person_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Json(payload): Json<CreatePersonDto>,
) -> Result<Json<PersonView>, ApiError> {
    info!("Creating person");

    let person = payload.into_person(&user.user_id).map_err(ApiError::BadRequest)?;
    let person = repo::create_person(&pool, person).await.map_err(ApiError::Database)?;

    Ok(Json(PersonView::new(person, Utc::now().date_naive())))
}

/// Handler for retrieving one person
///
/// This function handles GET requests to `/people/{id}`.
#[instrument(skip(pool, user))]
pub async fn get_person_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Path(person_id): Path<String>,
) -> Result<Json<PersonView>, ApiError> {
    let person = repo::get_person(&pool, &user.user_id, &person_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(PersonView::new(person, Utc::now().date_naive())))
}

/// Handler for updating a person
///
/// This function handles PATCH requests to `/people/{id}`.
#[instrument(skip(pool, user, payload))]
pub async fn update_person_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Path(person_id): Path<String>,
    Json(payload): Json<UpdatePersonDto>,
) -> Result<Json<PersonView>, ApiError> {
    info!("Updating person");

    let person = repo::get_person(&pool, &user.user_id, &person_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    let person = payload.apply(person).map_err(ApiError::BadRequest)?;
    let person = repo::save_person(&pool, person)
        .await
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(PersonView::new(person, Utc::now().date_naive())))
}

/// Handler for deleting a person
///
/// This function handles DELETE requests to `/people/{id}`.
#[instrument(skip(pool, user))]
pub async fn delete_person_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Path(person_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    let deleted = repo::delete_person(&pool, &user.user_id, &person_id)
        .await
        .map_err(ApiError::Database)?;

    if !deleted {
        return Err(ApiError::NotFound);
    }

    info!("Deleted person with id: {}", person_id);
    Ok(Json(()))
}

/// Handler for birthdays coming up within `days` days
///
/// This function handles GET requests to `/people/birthdays`.
#[instrument(skip(pool, user))]
pub async fn upcoming_birthdays_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Query(query): Query<BirthdaysQuery>,
) -> Result<Json<Vec<UpcomingBirthday>>, ApiError> {
    if !(0..=366).contains(&query.days) {
        return Err(ApiError::BadRequest("days must be between 0 and 366".to_string()));
    }

    let people = repo::list_people(&pool, &user.user_id).map_err(ApiError::Database)?;
    let upcoming = views::upcoming_birthdays(&people, Utc::now().date_naive(), query.days);

    debug!("{} birthdays in the next {} days", upcoming.len(), query.days);
    Ok(Json(upcoming))
}
