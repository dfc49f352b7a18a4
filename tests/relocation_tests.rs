mod common;

use common::{
    AUTHOR, BOT_USER_ID, INVOKER, LogBuffer, invocation, post, reaction, settings,
    standard_platform,
};
use wrangler::core::config::{CleanupOnFailure, RelocationPolicy};
use wrangler::core::models::{Channel, RelocationMode, Team};
use wrangler::errors::{CommandError, WranglerError};
use wrangler::platform::ChatPlatform;
use wrangler::relocation::executor::MOVED_NOTICE;
use wrangler::relocation::{RelocateRequest, RelocationExecutor, relocate};
use wrangler::thread::build_thread;

fn request(mode: RelocationMode, destination: &str) -> RelocateRequest {
    RelocateRequest {
        mode,
        message_id: "root".to_string(),
        destination_channel_id: destination.to_string(),
        show_root_message: false,
        invocation: invocation("c-src"),
    }
}

fn policy_with_cleanup(cleanup_on_failure: CleanupOnFailure) -> RelocationPolicy {
    RelocationPolicy {
        cleanup_on_failure,
        ..RelocationPolicy::default()
    }
}

async fn destination(platform: &impl ChatPlatform) -> (Channel, Team) {
    let channel = platform.get_channel("c-dst").await.unwrap().unwrap();
    let team = platform.get_team("t1").await.unwrap().unwrap();
    (channel, team)
}

#[tokio::test]
async fn test_move_thread_end_to_end() {
    let platform = standard_platform();

    let text = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-dst"),
    )
    .await
    .unwrap();

    assert!(text.starts_with("A thread has been moved: https://chat.example.com/eng/pl/new-1\n"));
    assert!(text.contains("| Engineering | Channel c-dst | 3 |"));
    assert!(!text.contains("Original Thread Root Message"));

    assert_eq!(platform.deletes(), vec!["root".to_string()]);
    assert!(platform.is_deleted("r1") && platform.is_deleted("r2"));

    let copied = platform.posts_in("c-dst");
    let bodies: Vec<&str> = copied.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(
        bodies,
        vec!["text of root", "text of r1", "text of r2", MOVED_NOTICE]
    );
    assert_ne!(copied[0].id, "root");
    assert!(copied.iter().all(|m| m.user_id == common::BOT_USER_ID));
    assert!(copied[1..].iter().all(|m| m.root_id == copied[0].id));

    let dms = platform.dms();
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0].0, AUTHOR);
    assert!(dms[0].1.ends_with("https://chat.example.com/eng/pl/new-1"));
}

#[tokio::test]
async fn test_copy_leaves_original_untouched() {
    let platform = standard_platform();

    let text = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Copy, "c-dst"),
    )
    .await
    .unwrap();

    assert!(text.starts_with("Thread copy complete: "));
    assert!(platform.deletes().is_empty());
    assert!(platform.dms().is_empty());
    assert_eq!(platform.posts_in("c-dst").len(), 3);
    assert_eq!(platform.posts_in("c-src").len(), 3);
}

#[tokio::test]
async fn test_summary_includes_root_excerpt_on_request() {
    let platform = standard_platform();
    let mut req = request(RelocationMode::Copy, "c-dst");
    req.show_root_message = true;

    let text = relocate(&platform, &settings(), &RelocationPolicy::default(), &req)
        .await
        .unwrap();

    assert!(text.contains("Original Thread Root Message:\n```\ntext of root\n```"));
}

#[tokio::test]
async fn test_cross_team_denial_writes_nothing() {
    let platform = standard_platform();

    let err = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-far"),
    )
    .await
    .unwrap_err();

    match err {
        CommandError::UserFacing(text) => assert!(text.contains("different teams")),
        CommandError::Internal(e) => panic!("unexpected internal error: {e}"),
    }
    assert_eq!(platform.write_count(), 0);
}

#[tokio::test]
async fn test_unknown_post_is_user_facing() {
    let platform = standard_platform();
    let mut req = request(RelocationMode::Move, "c-dst");
    req.message_id = "nope".to_string();

    let err = relocate(&platform, &settings(), &RelocationPolicy::default(), &req)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CommandError::UserFacing(ref t) if t == "Error: unable to get post with ID nope; ensure this is correct"
    ));
}

#[tokio::test]
async fn test_destination_without_membership_is_user_facing() {
    let platform = standard_platform();
    platform.add_channel(common::channel("c-closed", "t1", wrangler::core::models::ChannelType::Open));

    let err = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-closed"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        CommandError::UserFacing(ref t) if t == "Error: channel with ID c-closed doesn't exist or you are not a member"
    ));
    assert_eq!(platform.write_count(), 0);
}

#[tokio::test]
async fn test_reply_order_survives_reaction_failures() {
    let platform = standard_platform();
    platform.add_reaction(reaction("root", "u-one", "eyes"));
    platform.add_reaction(reaction("r2", "u-one", "tada"));
    platform.fail_reactions_for("r1");

    relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Copy, "c-dst"),
    )
    .await
    .unwrap();

    let bodies: Vec<String> = platform
        .posts_in("c-dst")
        .into_iter()
        .map(|m| m.message)
        .collect();
    assert_eq!(bodies, vec!["text of root", "text of r1", "text of r2"]);

    let targets: Vec<String> = platform
        .added_reactions()
        .into_iter()
        .map(|r| r.post_id)
        .collect();
    assert_eq!(targets, vec!["new-1".to_string(), "new-3".to_string()]);
}

#[tokio::test]
async fn test_reaction_failures_are_counted_not_fatal() {
    let platform = standard_platform();
    platform.add_reaction(reaction("r1", "u-one", "tada"));
    platform.add_reaction(reaction("r1", "u-two", "eyes"));
    platform.fail_add_reaction();
    let thread = build_thread(&platform, "root").await.unwrap();
    let (channel, team) = destination(&platform).await;
    let settings = settings();

    let result = RelocationExecutor::new(&platform, &settings, CleanupOnFailure::LeavePartial)
        .execute(&thread, &channel, &team, RelocationMode::Move, INVOKER)
        .await
        .unwrap();

    assert_eq!(result.reaction_failures, 2);
    assert_eq!(result.message_count, 3);
    assert!(platform.is_deleted("root"));
}

#[tokio::test]
async fn test_copy_failure_leaves_partial_copy_by_default() {
    let platform = standard_platform();
    platform.fail_create_on(3);

    let err = relocate(
        &platform,
        &settings(),
        &policy_with_cleanup(CleanupOnFailure::LeavePartial),
        &request(RelocationMode::Move, "c-dst"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        CommandError::Internal(WranglerError::Upstream(_))
    ));
    assert!(platform.deletes().is_empty());
    assert_eq!(platform.posts_in("c-src").len(), 3);
    assert_eq!(platform.posts_in("c-dst").len(), 2);
}

#[tokio::test]
async fn test_copy_failure_deletes_partial_copy_when_configured() {
    let platform = standard_platform();
    platform.fail_create_on(3);

    let err = relocate(
        &platform,
        &settings(),
        &policy_with_cleanup(CleanupOnFailure::DeletePartial),
        &request(RelocationMode::Move, "c-dst"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Internal(_)));
    assert_eq!(platform.deletes(), vec!["new-1".to_string()]);
    assert!(platform.posts_in("c-dst").is_empty());
    assert_eq!(platform.posts_in("c-src").len(), 3);
}

#[tokio::test]
async fn test_failed_notice_keeps_original() {
    let platform = standard_platform();
    platform.fail_create_on(4);

    let err = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-dst"),
    )
    .await
    .unwrap_err();

    match err {
        CommandError::Internal(WranglerError::Upstream(msg)) => {
            assert!(msg.contains("unable to create new bot post"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!platform.is_deleted("root"));
    assert!(platform.dms().is_empty());
}

#[tokio::test]
async fn test_failed_delete_is_internal_and_keeps_copy() {
    let platform = standard_platform();
    platform.fail_delete();

    let err = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-dst"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Internal(WranglerError::Upstream(_))));
    assert_eq!(platform.posts_in("c-dst").len(), 4);
    assert_eq!(platform.posts_in("c-src").len(), 3);
}

#[tokio::test]
async fn test_failed_author_dm_is_a_warning() {
    let platform = standard_platform();
    platform.fail_dm();
    let thread = build_thread(&platform, "root").await.unwrap();
    let (channel, team) = destination(&platform).await;
    let settings = settings();

    let result = RelocationExecutor::new(&platform, &settings, CleanupOnFailure::LeavePartial)
        .execute(&thread, &channel, &team, RelocationMode::Move, INVOKER)
        .await
        .unwrap();

    assert_eq!(result.author_notified, Some(false));
    assert!(platform.is_deleted("root"));
}

#[tokio::test]
async fn test_author_moving_own_thread_gets_no_dm() {
    let platform = standard_platform();
    let thread = build_thread(&platform, "root").await.unwrap();
    let (channel, team) = destination(&platform).await;
    let settings = settings();

    let result = RelocationExecutor::new(&platform, &settings, CleanupOnFailure::LeavePartial)
        .execute(&thread, &channel, &team, RelocationMode::Move, AUTHOR)
        .await
        .unwrap();

    assert_eq!(result.author_notified, None);
    assert!(platform.dms().is_empty());
}

#[tokio::test]
async fn test_reactions_are_replayed_by_the_bot_once_per_emoji() {
    let platform = standard_platform();
    platform.add_reaction(reaction("root", "u-one", "tada"));
    platform.add_reaction(reaction("root", "u-two", "tada"));
    platform.add_reaction(reaction("root", "u-two", "eyes"));

    relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Copy, "c-dst"),
    )
    .await
    .unwrap();

    let added = platform.added_reactions();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|r| r.user_id == BOT_USER_ID && r.post_id == "new-1"));
    let emoji: Vec<&str> = added.iter().map(|r| r.emoji_name.as_str()).collect();
    assert_eq!(emoji, vec!["tada", "eyes"]);
}

fn thread_with_files(platform: &common::FakePlatform) {
    let mut root = post("froot", AUTHOR, "c-src", "", 50);
    root.file_ids = vec!["f1".to_string(), "f2".to_string()];
    let mut reply = post("freply", "u-one", "c-src", "froot", 60);
    reply.file_ids = vec!["f3".to_string()];
    platform.add_post(root);
    platform.add_post(reply);
}

fn files_request(mode: RelocationMode) -> RelocateRequest {
    RelocateRequest {
        message_id: "froot".to_string(),
        ..request(mode, "c-dst")
    }
}

#[tokio::test]
async fn test_attachments_are_duplicated_into_destination() {
    let platform = standard_platform();
    thread_with_files(&platform);

    relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &files_request(RelocationMode::Move),
    )
    .await
    .unwrap();

    let created = platform.created();
    assert_eq!(created[0].file_ids, vec!["copy-of-f1", "copy-of-f2"]);
    assert_eq!(created[1].file_ids, vec!["copy-of-f3"]);
    assert!(
        platform
            .copied_files()
            .iter()
            .all(|(_, channel_id)| channel_id == "c-dst")
    );
    assert!(platform.is_deleted("froot"));
}

#[tokio::test]
async fn test_attachment_that_cannot_be_copied_is_dropped_and_counted() {
    let platform = standard_platform();
    thread_with_files(&platform);
    platform.fail_copy_file("f2");
    let thread = build_thread(&platform, "froot").await.unwrap();
    let (channel, team) = destination(&platform).await;
    let settings = settings();

    let result = RelocationExecutor::new(&platform, &settings, CleanupOnFailure::LeavePartial)
        .execute(&thread, &channel, &team, RelocationMode::Copy, INVOKER)
        .await
        .unwrap();

    assert_eq!(result.dropped_attachments, 1);
    assert_eq!(result.message_count, 2);
    assert_eq!(platform.created()[0].file_ids, vec!["copy-of-f1"]);
}

#[tokio::test]
async fn test_platform_failure_is_logged_with_request_context() {
    let logs = LogBuffer::default();
    let _guard = logs.capture();
    let platform = standard_platform();
    platform.fail_team();

    let err = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-dst"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Internal(WranglerError::Upstream(_))));
    assert_eq!(platform.write_count(), 0);
    let output = logs.contents();
    assert!(output.contains("Thread relocation failed"));
    assert!(output.contains("user_id=u-invoker"));
    assert!(output.contains("original_post_id=root"));
    assert!(output.contains("destination_channel_id=c-dst"));
    assert!(output.contains("team t1 unavailable"));
}

#[tokio::test]
async fn test_policy_denial_is_not_logged_as_failure() {
    let logs = LogBuffer::default();
    let _guard = logs.capture();
    let platform = standard_platform();

    let err = relocate(
        &platform,
        &settings(),
        &RelocationPolicy::default(),
        &request(RelocationMode::Move, "c-far"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::UserFacing(_)));
    assert!(!logs.contents().contains("Thread relocation failed"));
}
