use serde_json::json;
use tandem::error::DeployError;
use tandem::settings::{BranchTarget, Settings};
use tandem::target::{PipelineStage, TriggerEvent, resolve_targets};

const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

#[test]
fn pull_request_gets_review_target() {
    let event = TriggerEvent::PullRequest {
        number: Some(42),
        head_sha: SHA.into(),
    };

    let targets = resolve_targets(&event, &Settings::new()).unwrap();

    assert_eq!(targets.len(), 1);
    let target = &targets[0];
    assert_eq!(target.primary_app, "runn-pr-42-app");
    assert_eq!(target.gateway_app, "runn-pr-42-hasura");
    assert_eq!(target.primary_url, "https://runn-pr-42-app.herokuapp.com");
    assert_eq!(target.pipeline_stage, PipelineStage::Development);
    assert_eq!(target.commit_sha, SHA);
    assert_eq!(target.team, "runn");
    assert_eq!(target.pipeline_name, "runn-app");
    assert!(target.create_app_if_not_exists);
    assert!(target.has_pull_request);
}

#[test]
fn pull_request_without_number_is_unresolvable() {
    let event = TriggerEvent::PullRequest {
        number: None,
        head_sha: SHA.into(),
    };

    assert!(matches!(
        resolve_targets(&event, &Settings::new()),
        Err(DeployError::UnresolvableTarget(_))
    ));
}

#[test]
fn production_push() {
    let event = TriggerEvent::Push {
        branch: "refs/heads/production".into(),
        sha: SHA.into(),
    };

    let targets = resolve_targets(&event, &Settings::new()).unwrap();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].primary_app, "runn-app-production");
    assert_eq!(targets[0].gateway_app, "runn-hasura-production");
    assert_eq!(targets[0].pipeline_stage, PipelineStage::Production);
    assert!(!targets[0].create_app_if_not_exists);
    assert!(!targets[0].has_pull_request);
}

#[test]
fn development_push_deploys_staging() {
    let event = TriggerEvent::Push {
        branch: "development".into(),
        sha: SHA.into(),
    };

    let targets = resolve_targets(&event, &Settings::new()).unwrap();

    assert_eq!(targets[0].primary_app, "runn-app-staging");
    assert_eq!(targets[0].pipeline_stage, PipelineStage::Staging);
}

#[test]
fn branch_may_fan_out_to_several_targets() {
    let settings = Settings::new().branch(BranchTarget::new(
        "refs/heads/production",
        "runn-app-production-eu",
        "runn-hasura-production-eu",
        PipelineStage::Production,
    ));
    let event = TriggerEvent::Push {
        branch: "refs/heads/production".into(),
        sha: SHA.into(),
    };

    let names: Vec<String> = resolve_targets(&event, &settings)
        .unwrap()
        .into_iter()
        .map(|t| t.primary_app)
        .collect();

    assert_eq!(names, vec!["runn-app-production", "runn-app-production-eu"]);
}

#[test]
fn unknown_branch_is_unresolvable() {
    let event = TriggerEvent::Push {
        branch: "refs/heads/feature/x".into(),
        sha: SHA.into(),
    };

    let err = resolve_targets(&event, &Settings::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "no deployment target: unknown branch \"refs/heads/feature/x\""
    );
}

#[test]
fn event_from_pull_request_payload() {
    let payload = json!({
        "number": 17,
        "pull_request": { "number": 17, "head": { "sha": SHA } },
    });

    let event =
        TriggerEvent::from_github("pull_request", "refs/pull/17/merge", "merge-sha", Some(&payload))
            .unwrap();

    assert_eq!(
        event,
        TriggerEvent::PullRequest {
            number: Some(17),
            head_sha: SHA.into(),
        }
    );
}

#[test]
fn event_without_payload_has_no_number() {
    let event = TriggerEvent::from_github("pull_request", "refs/pull/17/merge", SHA, None).unwrap();

    assert_eq!(
        event,
        TriggerEvent::PullRequest {
            number: None,
            head_sha: SHA.into(),
        }
    );
}

#[test]
fn event_from_push() {
    let event = TriggerEvent::from_github("push", "refs/heads/production", SHA, None).unwrap();

    assert_eq!(
        event,
        TriggerEvent::Push {
            branch: "refs/heads/production".into(),
            sha: SHA.into(),
        }
    );
}

#[test]
fn unhandled_event_name() {
    assert!(matches!(
        TriggerEvent::from_github("schedule", "refs/heads/production", SHA, None),
        Err(DeployError::UnresolvableTarget(_))
    ));
}
