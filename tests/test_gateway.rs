mod common;
use chrono::{TimeZone, Utc};
use company_panel_core::gateway::{GatewayError, LifecyclePhase, LIFECYCLE_STAGE_PROPERTY};
use company_panel_core::PropertyGateway;
use common::{setup_store, RECORD_ID};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_gateway_fetches_property_metadata() -> anyhow::Result<()> {
    let store = setup_store(json!({}))?;
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let meta = gateway
        .fetch_field_metadata(Some("companies"), Some("industry"))
        .await?;
    assert_eq!(meta.name, "industry");
    assert_eq!(meta.field_type.as_deref(), Some("select"));
    assert_eq!(meta.options.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_gateway_missing_parameters_send_nothing() -> anyhow::Result<()> {
    let store = setup_store(json!({}))?;
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let err = gateway
        .fetch_field_metadata(None, Some("industry"))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::MissingParameter("objectType"));

    let err = gateway
        .fetch_field_metadata(Some("companies"), Some(""))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::MissingParameter("propertyName"));

    let err = gateway
        .fetch_current_values(None, &["name".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::MissingParameter("hs_object_id"));

    let err = gateway
        .write_property(None, Some("name"), Some(&json!("Acme")))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::MissingParameter("hs_object_id"));

    let err = gateway
        .write_property(Some(RECORD_ID), Some("name"), Some(&json!("")))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::MissingParameter("newValue"));

    let err = gateway
        .write_property(Some(RECORD_ID), Some("name"), None)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::MissingParameter("newValue"));

    let err = gateway
        .write_lifecycle_stage_with_reset(None, Some("customer"))
        .await
        .unwrap_err();
    assert_eq!(err.source, GatewayError::MissingParameter("hs_object_id"));

    assert_eq!(store.request_count(), 0);
    assert!(store.updates().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_gateway_wraps_remote_errors() -> anyhow::Result<()> {
    let store = setup_store(json!({}))?;
    store.fail_metadata_for("industry");
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let err = gateway
        .fetch_field_metadata(Some("companies"), Some("industry"))
        .await
        .unwrap_err();
    match err {
        GatewayError::RemoteError(remote) => assert_eq!(remote.status, Some(500)),
        other => panic!("expected remote error, got {other:?}"),
    }

    let err = gateway
        .fetch_field_metadata(Some("companies"), Some("no_such_property"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RemoteError(ref e) if e.status == Some(404)));
    Ok(())
}

#[tokio::test]
async fn test_gateway_reads_requested_current_values() -> anyhow::Result<()> {
    let store = setup_store(json!({"name": "Acme", "industry": "HOSPITALITY"}))?;
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let record = gateway
        .fetch_current_values(
            Some(RECORD_ID),
            &["name".to_string(), "description".to_string()],
        )
        .await?;
    assert_eq!(record.id, RECORD_ID);
    assert_eq!(record.properties["name"], json!("Acme"));
    assert_eq!(record.properties["description"], json!(null));
    assert!(!record.properties.contains_key("industry"));
    assert_eq!(store.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_gateway_write_coerces_arrays_and_dates() -> anyhow::Result<()> {
    let store = setup_store(json!({}))?;
    let gateway = PropertyGateway::new(Arc::clone(&store));

    gateway
        .write_property(
            Some(RECORD_ID),
            Some("interests"),
            Some(&json!(["golf", "tennis"])),
        )
        .await?;
    gateway
        .write_property(
            Some(RECORD_ID),
            Some("founded_date"),
            Some(&json!({"year": 2024, "month": 2, "date": 1, "formattedDate": "2024-03-01"})),
        )
        .await?;
    gateway
        .write_property(Some(RECORD_ID), Some("name"), Some(&json!("Acme")))
        .await?;

    let updates = store.updates();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0].properties["interests"], json!("golf;tennis"));
    let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().timestamp_millis();
    assert_eq!(updates[1].properties["founded_date"], json!(midnight));
    assert_eq!(updates[2].properties["name"], json!("Acme"));
    assert!(updates.iter().all(|u| u.record_id == RECORD_ID));
    Ok(())
}

#[tokio::test]
async fn test_gateway_lifecycle_reset_writes_empty_then_stage() -> anyhow::Result<()> {
    let store = setup_store(json!({"lifecyclestage": "customer"}))?;
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let record = gateway
        .write_lifecycle_stage_with_reset(Some(RECORD_ID), Some("S"))
        .await?;
    assert_eq!(record.properties[LIFECYCLE_STAGE_PROPERTY], json!("S"));

    let writes: Vec<_> = store
        .updates()
        .into_iter()
        .map(|u| u.properties[LIFECYCLE_STAGE_PROPERTY].clone())
        .collect();
    assert_eq!(writes, vec![json!(""), json!("S")]);
    Ok(())
}

#[tokio::test]
async fn test_gateway_lifecycle_interrupted_after_clear() -> anyhow::Result<()> {
    let store = setup_store(json!({"lifecyclestage": "customer"}))?;
    store.fail_writes_with(LIFECYCLE_STAGE_PROPERTY, json!("lead"));
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let err = gateway
        .write_lifecycle_stage_with_reset(Some(RECORD_ID), Some("lead"))
        .await
        .unwrap_err();
    assert_eq!(err.phase, LifecyclePhase::Set);
    assert!(err.left_stage_empty());

    let record = store.record("companies", RECORD_ID).expect("record exists");
    assert_eq!(record[LIFECYCLE_STAGE_PROPERTY], json!(""));
    Ok(())
}

#[tokio::test]
async fn test_gateway_lifecycle_clear_failure_skips_set() -> anyhow::Result<()> {
    let store = setup_store(json!({"lifecyclestage": "customer"}))?;
    store.fail_writes_with(LIFECYCLE_STAGE_PROPERTY, json!(""));
    let gateway = PropertyGateway::new(Arc::clone(&store));

    let err = gateway
        .write_lifecycle_stage_with_reset(Some(RECORD_ID), Some("lead"))
        .await
        .unwrap_err();
    assert_eq!(err.phase, LifecyclePhase::Clear);
    assert!(!err.left_stage_empty());
    assert_eq!(store.updates().len(), 1);

    let record = store.record("companies", RECORD_ID).expect("record exists");
    assert_eq!(record[LIFECYCLE_STAGE_PROPERTY], json!("customer"));
    Ok(())
}
