use profiles_core::db::open_db_in_memory;
use profiles_core::{
    enrich_draft, AgeComparison, DeletionRequest, Enrichment, FilterCriteria, LogHandle,
    NewProfile, ProfileDraft, ProfileService, ProfileValidationError, RequestContext,
    ServiceError, SqliteProfileStore, StaticEnricher, UpdateCriteria,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &mut Connection) -> ProfileService<SqliteProfileStore<'_>> {
    ProfileService::new(
        SqliteProfileStore::new(conn, LogHandle::silent("store")),
        LogHandle::silent("service"),
    )
}

#[test]
fn create_update_list_delete_round_trip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();

    let enricher = StaticEnricher::new(Enrichment {
        age: Some(45),
        gender: Some("male".to_string()),
        nationality: Some("RU".to_string()),
    });
    let new_profile = enrich_draft(&enricher, ProfileDraft::new("Igor", "Zaycev")).unwrap();
    let guid = profiles.create_profile(&ctx, new_profile).unwrap();

    let mut patch = UpdateCriteria::for_guid(guid.clone());
    patch.age = Some(33);
    assert_eq!(profiles.update_profile(&ctx, &patch).unwrap(), guid);

    let mut criteria = FilterCriteria::page(1, 10);
    criteria.name = Some("Igor".to_string());
    let listed = profiles.list_profiles(&ctx, &criteria).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].guid, guid);
    assert_eq!(listed[0].surname, "Zaycev");
    assert_eq!(listed[0].age, Some(33));
    assert_eq!(listed[0].gender.as_deref(), Some("male"));
    assert_eq!(listed[0].nationality.as_deref(), Some("RU"));

    assert_eq!(
        profiles
            .delete_profile(&ctx, &DeletionRequest::new(guid.clone()))
            .unwrap(),
        guid
    );
    assert!(profiles.list_profiles(&ctx, &criteria).unwrap().is_empty());
    assert_eq!(profiles.count_profiles(&ctx).unwrap(), 0);
}

#[test]
fn create_assigns_distinct_uuid_v4_identities() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();

    let first = profiles
        .create_profile(&ctx, NewProfile::new("Igor", "Zaycev"))
        .unwrap();
    let second = profiles
        .create_profile(&ctx, NewProfile::new("Igor", "Zaycev"))
        .unwrap();

    assert_ne!(first, second);
    for guid in [&first, &second] {
        let parsed = Uuid::parse_str(guid).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    let loaded = profiles.get_profile(&ctx, &first).unwrap();
    assert_eq!(loaded.name, "Igor");
    assert_eq!(loaded.age, None);
}

#[test]
fn invalid_input_is_rejected_before_storage() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();

    let err = profiles
        .create_profile(&ctx, NewProfile::new("", "Zaycev"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidRequest(ProfileValidationError::FieldLength { field: "name", .. })
    ));

    let err = profiles
        .list_profiles(&ctx, &FilterCriteria::page(0, 10))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidRequest(ProfileValidationError::InvalidPage(0))
    ));

    let err = profiles
        .list_profiles(&ctx, &FilterCriteria::page(1, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidRequest(ProfileValidationError::InvalidPageSize(0))
    ));

    let err = profiles
        .delete_profile(&ctx, &DeletionRequest::new("  "))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidRequest(ProfileValidationError::EmptyIdentity)
    ));

    assert_eq!(profiles.count_profiles(&ctx).unwrap(), 0);
}

#[test]
fn store_kinds_map_to_service_kinds() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();

    let mut patch = UpdateCriteria::for_guid("missing");
    patch.name = Some("Ivan".to_string());
    let not_found = profiles.update_profile(&ctx, &patch).unwrap_err();
    assert!(matches!(&not_found, ServiceError::ProfileNotFound(guid) if guid == "missing"));
    assert!(not_found.is_conflict());

    let no_changes = profiles
        .update_profile(&ctx, &UpdateCriteria::for_guid("missing"))
        .unwrap_err();
    assert!(matches!(no_changes, ServiceError::NoChanges));
    assert!(no_changes.is_conflict());

    let missing_delete = profiles
        .delete_profile(&ctx, &DeletionRequest::new("missing"))
        .unwrap_err();
    assert!(matches!(missing_delete, ServiceError::ProfileNotFound(_)));

    let missing_get = profiles.get_profile(&ctx, "missing").unwrap_err();
    assert!(matches!(missing_get, ServiceError::ProfileNotFound(_)));

    let invalid = profiles
        .list_profiles(&ctx, &FilterCriteria::page(0, 1))
        .unwrap_err();
    assert!(!invalid.is_conflict());
}

#[test]
fn cancelled_context_maps_to_cancelled() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();
    ctx.cancel_handle().cancel();

    let err = profiles
        .create_profile(&ctx, NewProfile::new("Igor", "Zaycev"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Cancelled(_)));
    assert!(!err.is_conflict());
}

#[test]
fn attribute_rules_apply_to_patches() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();
    let guid = profiles
        .create_profile(&ctx, NewProfile::new("Igor", "Zaycev"))
        .unwrap();

    let mut patch = UpdateCriteria::for_guid(guid.clone());
    patch.age = Some(131);
    assert!(matches!(
        profiles.update_profile(&ctx, &patch).unwrap_err(),
        ServiceError::InvalidRequest(ProfileValidationError::AgeOutOfRange(131))
    ));

    let mut patch = UpdateCriteria::for_guid(guid.clone());
    patch.nationality = Some("RUS1".to_string());
    assert!(matches!(
        profiles.update_profile(&ctx, &patch).unwrap_err(),
        ServiceError::InvalidRequest(ProfileValidationError::InvalidNationality(_))
    ));

    let mut patch = UpdateCriteria::for_guid(guid.clone());
    patch.age = Some(130);
    patch.nationality = Some("UA".to_string());
    profiles.update_profile(&ctx, &patch).unwrap();

    let mut criteria = FilterCriteria::page(1, 5);
    criteria.age = Some(100);
    criteria.age_comparison = AgeComparison::Greater;
    criteria.nationality = Some("UA".to_string());
    let listed = profiles.list_profiles(&ctx, &criteria).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].guid, guid);
}

#[test]
fn page_far_past_the_end_is_empty() {
    let mut conn = open_db_in_memory().unwrap();
    let mut profiles = service(&mut conn);
    let ctx = RequestContext::background();
    profiles
        .create_profile(&ctx, NewProfile::new("Igor", "Zaycev"))
        .unwrap();

    let listed = profiles
        .list_profiles(&ctx, &FilterCriteria::page(u32::MAX, u32::MAX))
        .unwrap();
    assert!(listed.is_empty());
}
