//! Cache cluster reconcile flows against a scripted client

mod common;

use common::{FakeElastiCache, arn, cache_cluster, context, tags};
use elasticache_core::diff::ConfigDiff;
use elasticache_core::error::ApiError;
use elasticache_core::model::CreateCacheClusterInput;
use elasticache_core::planner::cache_cluster::fields;
use elasticache_core::workflows::{CacheClusterReconciler, ReadOptions};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn reconciler(client: &Arc<FakeElastiCache>) -> CacheClusterReconciler<FakeElastiCache> {
    CacheClusterReconciler::new(client.clone(), context())
}

fn memcached(id: &str, nodes: i32) -> CreateCacheClusterInput {
    CreateCacheClusterInput::new(id, "memcached")
        .with_node_type("cache.t3.micro")
        .with_num_cache_nodes(nodes)
}

#[tokio::test(start_paused = true)]
async fn test_create_waits_until_available() {
    let client = FakeElastiCache::new();
    client.script_cache_cluster(&cache_cluster("mc"), &["creating", "creating", "available"]);

    let cluster = reconciler(&client).create(&memcached("mc", 2)).await.unwrap();

    assert_eq!(cluster.status, "available");
    assert_eq!(client.mutations(), vec!["create_cache_cluster mc tags=0"]);
    assert_eq!(client.count("describe_cache_cluster"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_create_rejects_zone_count_mismatch() {
    let client = FakeElastiCache::new();

    let mut input = memcached("mc", 3);
    input.preferred_availability_zones = vec!["us-west-2a".to_string(), "us-west-2b".to_string()];
    let err = reconciler(&client).create(&input).await.unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("preferred_availability_zones"));
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_rejects_engine_with_replication_group() {
    let client = FakeElastiCache::new();

    let mut input = memcached("mc", 1);
    input.replication_group_id = Some("rg".to_string());
    let err = reconciler(&client).create(&input).await.unwrap_err();

    assert!(err.is_validation());
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_rejects_multi_node_redis() {
    let client = FakeElastiCache::new();

    let input = CreateCacheClusterInput::new("redis", "redis").with_num_cache_nodes(2);
    let err = reconciler(&client).create(&input).await.unwrap_err();

    assert!(err.is_validation());
}

#[tokio::test(start_paused = true)]
async fn test_create_applies_default_tags() {
    let client = FakeElastiCache::new();
    client.script_cache_cluster(&cache_cluster("mc"), &["available"]);
    let context = elasticache_core::workflows::ReconcileContext::default()
        .with_default_tags(tags(&[("owner", "platform")]));
    let reconciler = CacheClusterReconciler::new(client.clone(), Arc::new(context));

    reconciler
        .create(&memcached("mc", 1).with_tags(tags(&[("env", "test")])))
        .await
        .unwrap();

    assert_eq!(client.mutations(), vec!["create_cache_cluster mc tags=2"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_modifies_and_waits() {
    let client = FakeElastiCache::new();
    client.script_cache_cluster(&cache_cluster("mc"), &["modifying", "available"]);

    let mut diff = ConfigDiff::new()
        .with_unchanged("engine", "memcached")
        .with_change(fields::NUM_CACHE_NODES, 2, 3);
    reconciler(&client).update("mc", &mut diff).await.unwrap();

    assert_eq!(client.mutations(), vec!["modify_cache_cluster mc"]);
    assert_eq!(client.count("describe_cache_cluster"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_times_out_with_last_status() {
    let client = FakeElastiCache::new();
    client.script_cache_cluster(&cache_cluster("mc"), &["modifying"]);

    let mut config = elasticache_core::config::ReconcilerConfig::default();
    config.cache_cluster.update_secs = 60;
    let context = Arc::new(elasticache_core::workflows::ReconcileContext::new(config));
    let reconciler = CacheClusterReconciler::new(client.clone(), context);

    let mut diff = ConfigDiff::new().with_change(fields::NUM_CACHE_NODES, 2, 3);
    let err = reconciler.update("mc", &mut diff).await.unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("modifying"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn test_read_reports_tags() {
    let client = FakeElastiCache::new();
    client.script_cache_cluster(&cache_cluster("redis"), &["available"]);
    client.set_tags(&arn("cluster", "redis"), tags(&[("env", "test")]));

    let state = reconciler(&client)
        .read("redis", &ReadOptions::default().with_engine_version("7.0"))
        .await
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(state.engine_version.as_deref(), Some("7.0"));
    assert_eq!(state.engine_version_actual.as_deref(), Some("7.0.7"));
    assert_eq!(state.tags, tags(&[("env", "test")]));
}

#[tokio::test(start_paused = true)]
async fn test_delete_retries_while_snapshotting() {
    let client = FakeElastiCache::new();
    client.script_cache_cluster(&cache_cluster("mc"), &["deleting"]);
    client.script_cache_cluster_missing("mc");
    client.fail_next(
        "delete_cache_cluster",
        ApiError::invalid_state("InvalidCacheClusterState", "Cluster mc is snapshotting"),
    );

    reconciler(&client).delete("mc", Some("mc-final")).await.unwrap();

    assert_eq!(
        client.mutations(),
        vec!["delete_cache_cluster mc snapshot=mc-final", "delete_cache_cluster mc snapshot=mc-final"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_replication_group_primary_fails() {
    let client = FakeElastiCache::new();
    client.fail_next(
        "delete_cache_cluster",
        ApiError::invalid_state(
            "InvalidCacheClusterState",
            "Cannot delete cluster rg-001 which is the only member of a replication group",
        ),
    );

    let err = reconciler(&client).delete("rg-001", None).await.unwrap_err();

    assert!(!err.is_retryable());
    assert_eq!(client.count("delete_cache_cluster"), 1);
    assert_eq!(client.count("describe_cache_cluster"), 0);
}
