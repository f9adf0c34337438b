//! End-to-end lifecycle scenarios against a real sled database.

use plan_store::error::PlanError;
use plan_store::service::{PlanService, Retrieval};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

// Sled uses file-based locking to prevent concurrent access, so each test
// gets its own database under a tempdir for simplified cleanup.
fn fresh_service(name: &str) -> anyhow::Result<(TempDir, PlanService)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = TempDir::new()?;
    let db = sled::open(temp_dir.path().join(name))?;
    db.clear()?;
    Ok((temp_dir, PlanService::new(Arc::new(db))))
}

fn sample_plan(object_id: &str) -> Value {
    json!({
        "objectId": object_id,
        "objectType": "plan",
        "planType": "inNetwork",
        "_org": "example.com",
        "creationDate": "01-02-2023",
        "planCostShares": {
            "deductible": 2000,
            "copay": 23,
            "_org": "example.com",
            "objectId": format!("{object_id}-costshares"),
            "objectType": "membercostshare"
        },
        "linkedPlanServices": []
    })
}

#[test]
fn create_replace_delete_lifecycle() -> anyhow::Result<()> {
    let (_dir, service) = fresh_service("lifecycle.db")?;

    // Create yields a version token.
    let created = service.create(sample_plan("p1"))?;
    let first_token = created.etag.clone();

    // Replace with a wrong token fails the precondition.
    let mut changed = sample_plan("p1");
    changed["planType"] = json!("outOfNetwork");
    let err = service
        .replace("p1", Some("wrong"), changed.clone())
        .unwrap_err();
    assert!(matches!(err, PlanError::PreconditionFailed));
    assert_eq!(err.status(), 412);

    // Replace with the current token succeeds and moves the version.
    let replaced = service.replace("p1", Some(&first_token), changed)?;
    assert_ne!(replaced.etag, first_token);

    // Deleting against the now-stale token fails; the fresh one succeeds.
    let err = service.delete("p1", Some(&first_token)).unwrap_err();
    assert!(matches!(err, PlanError::PreconditionFailed));
    service.delete("p1", Some(&replaced.etag))?;

    // Gone for good.
    let err = service.retrieve("p1", None).unwrap_err();
    assert!(matches!(err, PlanError::NotFound(_)));
    assert_eq!(err.status(), 404);

    Ok(())
}

#[test]
fn conditional_reads_round_trip() -> anyhow::Result<()> {
    let (_dir, service) = fresh_service("reads.db")?;

    let document = sample_plan("p2");
    let created = service.create(document.clone())?;

    // Plain read returns the document byte-for-byte with the same token.
    let Retrieval::Current(revision) = service.retrieve("p2", None)? else {
        panic!("expected a current revision");
    };
    assert_eq!(revision.document, document);
    assert_eq!(revision.etag, created.etag);

    // Reading again without intervening writes changes nothing.
    let Retrieval::Current(again) = service.retrieve("p2", None)? else {
        panic!("expected a current revision");
    };
    assert_eq!(again.document, revision.document);
    assert_eq!(again.etag, revision.etag);

    // A current If-None-Match short-circuits with no body.
    let outcome = service.retrieve("p2", Some(&created.etag))?;
    assert_eq!(
        outcome,
        Retrieval::NotModified {
            etag: created.etag.clone()
        }
    );

    // A stale If-None-Match still serves the document.
    let outcome = service.retrieve("p2", Some("some-old-token"))?;
    assert!(matches!(outcome, Retrieval::Current(_)));

    Ok(())
}

#[test]
fn merge_is_a_shallow_overlay() -> anyhow::Result<()> {
    let (_dir, service) = fresh_service("merge.db")?;

    let mut document = sample_plan("p3");
    document["linkedPlanServices"] = json!([{
        "linkedService": {
            "_org": "example.com",
            "objectId": "svc1",
            "objectType": "service",
            "name": "Yearly physical"
        },
        "planserviceCostShares": {
            "deductible": 10,
            "copay": 0,
            "_org": "example.com",
            "objectId": "svc1-costshares",
            "objectType": "membercostshare"
        }
    }]);
    let created = service.create(document.clone())?;

    let merged = service.merge(
        "p3",
        Some(&created.etag),
        json!({"planType": "outOfNetwork"}),
    )?;

    // Only the named top-level field changed.
    assert_eq!(merged.document["planType"], json!("outOfNetwork"));
    assert_eq!(
        merged.document["linkedPlanServices"],
        document["linkedPlanServices"]
    );
    assert_eq!(merged.document["creationDate"], document["creationDate"]);
    assert_ne!(merged.etag, created.etag);

    // The merge result is what subsequent reads observe.
    let Retrieval::Current(revision) = service.retrieve("p3", None)? else {
        panic!("expected a current revision");
    };
    assert_eq!(revision.document, merged.document);
    assert_eq!(revision.etag, merged.etag);

    Ok(())
}

#[test]
fn duplicate_create_conflicts() -> anyhow::Result<()> {
    let (_dir, service) = fresh_service("conflict.db")?;

    let created = service.create(sample_plan("p4"))?;

    // Same id conflicts even when the content differs.
    let mut other = sample_plan("p4");
    other["planType"] = json!("outOfNetwork");
    let err = service.create(other).unwrap_err();
    assert!(matches!(err, PlanError::AlreadyExists(ref id) if id.as_str() == "p4"));
    assert_eq!(err.status(), 409);

    // The original document was never overwritten.
    let Retrieval::Current(revision) = service.retrieve("p4", None)? else {
        panic!("expected a current revision");
    };
    assert_eq!(revision.etag, created.etag);
    assert_eq!(revision.document["planType"], json!("inNetwork"));

    Ok(())
}

#[test]
fn validation_failure_writes_nothing() -> anyhow::Result<()> {
    let (_dir, service) = fresh_service("validation.db")?;

    let mut incomplete = sample_plan("p5");
    incomplete.as_object_mut().unwrap().remove("creationDate");

    let err = service.create(incomplete).unwrap_err();
    assert_eq!(err.status(), 400);
    assert!(
        err.field_errors()
            .iter()
            .any(|field| field.path == "/creationDate")
    );

    // No entry was created for the rejected document.
    let err = service.retrieve("p5", None).unwrap_err();
    assert!(matches!(err, PlanError::NotFound(_)));

    Ok(())
}
