use super::*;
use serde_json::json;

fn create_dto(value: serde_json::Value) -> CreateMediaDto {
    serde_json::from_value(value).unwrap()
}

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap().and_hms_opt(10, 0, 0).unwrap()
}

#[test]
fn test_is_http_url() {
    assert!(is_http_url("https://example.com/poster.jpg"));
    assert!(is_http_url("http://localhost:3000"));
    assert!(!is_http_url("ftp://example.com"));
    assert!(!is_http_url("javascript:alert(1)"));
    assert!(!is_http_url("not a url"));
}

#[test]
fn test_create_media_defaults() {
    let media = create_dto(json!({"title": "  Heat ", "media_type": "movie"}))
        .into_media("alice")
        .unwrap();
    assert_eq!(media.title, "Heat");
    assert_eq!(media.status, MediaStatus::Planned);
    assert_eq!(media.user_id, "alice");
    assert!(media.genres.0.is_empty());
}

#[test]
fn test_create_media_validation() {
    let blank = create_dto(json!({"title": "   ", "media_type": "movie"}));
    assert_eq!(blank.into_media("alice").unwrap_err(), "title must not be empty");

    let rating = create_dto(json!({"title": "Heat", "media_type": "movie", "rating": 11}));
    assert!(rating.into_media("alice").unwrap_err().contains("rating"));

    let url = create_dto(json!({"title": "Heat", "media_type": "movie", "url": "file:///etc/passwd"}));
    assert!(url.into_media("alice").unwrap_err().contains("url"));

    let blank_imdb = create_dto(json!({"title": "Heat", "media_type": "movie", "imdb_id": " "}));
    assert_eq!(blank_imdb.into_media("alice").unwrap().imdb_id, None);
}

#[test]
fn test_update_media_keeps_absent_fields() {
    let mut media = Media::new("alice", "Heat".to_string(), MediaType::Movie, MediaStatus::Planned);
    media.rating = Some(8);

    let update: UpdateMediaDto = serde_json::from_value(json!({"creator": "Michael Mann"})).unwrap();
    let updated = update.apply(media, at(1)).unwrap();
    assert_eq!(updated.rating, Some(8));
    assert_eq!(updated.creator.as_deref(), Some("Michael Mann"));
    assert_eq!(updated.title, "Heat");
}

#[test]
fn test_update_media_status_stamps_dates() {
    let media = Media::new("alice", "Dune".to_string(), MediaType::Book, MediaStatus::Planned);

    let started = UpdateMediaDto { status: Some(MediaStatus::InProgress), ..Default::default() }
        .apply(media, at(1))
        .unwrap();
    assert_eq!(started.started_at, Some(at(1)));
    assert_eq!(started.finished_at, None);

    let finished = UpdateMediaDto { status: Some(MediaStatus::Completed), ..Default::default() }
        .apply(started, at(9))
        .unwrap();
    assert_eq!(finished.started_at, Some(at(1)));
    assert_eq!(finished.finished_at, Some(at(9)));
}

#[test]
fn test_update_media_rejects_blank_title() {
    let media = Media::new("alice", "Heat".to_string(), MediaType::Movie, MediaStatus::Planned);
    let update = UpdateMediaDto { title: Some(" ".to_string()), ..Default::default() };
    assert!(update.apply(media, at(1)).is_err());
}

#[test]
fn test_batch_limit() {
    let dto: BatchDto = serde_json::from_value(json!({})).unwrap();
    assert_eq!(dto.validated_limit(), Ok(10));
    assert!(BatchDto { limit: 0 }.validated_limit().is_err());
    assert!(BatchDto { limit: MAX_BATCH + 1 }.validated_limit().is_err());
    assert_eq!(BatchDto { limit: MAX_BATCH }.validated_limit(), Ok(MAX_BATCH));
}

#[test]
fn test_person_view_derives_birthday_fields() {
    let mut person = Person::new("alice", "Zoe".to_string());
    person.birthday = NaiveDate::from_ymd_opt(1990, 7, 25);
    let today = NaiveDate::from_ymd_opt(2024, 7, 20).unwrap();

    let view = PersonView::new(person, today);
    assert_eq!(view.zodiac, Some(ZodiacSign::Leo));
    assert_eq!(view.age, Some(33));
    assert_eq!(view.next_birthday, NaiveDate::from_ymd_opt(2024, 7, 25));
    assert_eq!(view.days_until_birthday, Some(5));

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["name"], "Zoe");
    assert_eq!(json["zodiac"], "leo");
}

#[test]
fn test_person_view_without_birthday() {
    let view = PersonView::new(Person::new("alice", "Adam".to_string()), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(view.zodiac, None);
    assert_eq!(view.age, None);
    assert_eq!(view.days_until_birthday, None);
}

#[test]
fn test_set_done_tracks_completion_time() {
    let mut todo = Todo::new("alice", "Pay rent".to_string());

    set_done(&mut todo, true, at(2));
    assert_eq!(todo.completed_at, Some(at(2)));

    // Already done keeps the first completion time
    set_done(&mut todo, true, at(5));
    assert_eq!(todo.completed_at, Some(at(2)));

    set_done(&mut todo, false, at(6));
    assert!(!todo.done);
    assert_eq!(todo.completed_at, None);
}

#[test]
fn test_tracking_entry_validation() {
    let dto: CreateTrackingDto = serde_json::from_value(json!({"metric": " Sleep ", "value": 7.5})).unwrap();
    let entry = dto.into_entry("alice", at(3)).unwrap();
    assert_eq!(entry.metric, "sleep");
    assert_eq!(entry.recorded_at, at(3));

    let nan = CreateTrackingDto { metric: "sleep".to_string(), value: f64::NAN, unit: None, note: None, recorded_at: None };
    assert!(nan.into_entry("alice", at(3)).is_err());
}

#[test]
fn test_palette_validation() {
    let dto: PaletteDto = serde_json::from_value(json!({"url": "https://example.com/a.png"})).unwrap();
    assert_eq!(dto.count, 5);
    assert!(dto.validate().is_ok());

    let too_many = PaletteDto { url: "https://example.com/a.png".to_string(), count: 17 };
    assert!(too_many.validate().is_err());
}

#[test]
fn test_query_defaults() {
    let tracking: TrackingQuery = serde_json::from_value(json!({})).unwrap();
    assert_eq!(tracking.range, DateRange::All);

    let stats: StatsQuery = serde_json::from_value(json!({"range": "week"})).unwrap();
    assert_eq!(stats.range, DateRange::Week);
    assert_eq!(stats.top, 10);

    let birthdays: BirthdaysQuery = serde_json::from_value(json!({})).unwrap();
    assert_eq!(birthdays.days, 30);
}
