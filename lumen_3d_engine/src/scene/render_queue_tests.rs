use glam::Mat4;
use slotmap::SlotMap;
use crate::render_engine::TechniqueHandle;
use super::*;

// ============================================================================
// Helpers
// ============================================================================

fn keys(n: usize) -> Vec<RenderableKey> {
    let mut map: SlotMap<RenderableKey, ()> = SlotMap::with_key();
    (0..n).map(|_| map.insert(())).collect()
}

fn techniques(n: usize) -> Vec<TechniqueHandle> {
    let mut map: SlotMap<TechniqueHandle, ()> = SlotMap::with_key();
    (0..n).map(|_| map.insert(())).collect()
}

fn instance() -> InstanceData {
    InstanceData::new(&Mat4::IDENTITY, &Mat4::IDENTITY, 0xFFFF_FFFF)
}

// ============================================================================
// Tests: bucketing
// ============================================================================

#[test]
fn test_push_creates_bucket_per_technique() {
    let r = keys(3);
    let t = techniques(2);
    let mut queue = RenderQueue::new();

    queue.push(r[0], t[0]);
    queue.push(r[1], t[0]);
    queue.push(r[2], t[1]);

    assert_eq!(queue.bucket_count(), 2);
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.buckets()[0].technique, t[0]);
    let first: Vec<_> = queue.buckets()[0].entries.iter().map(|e| e.renderable).collect();
    assert_eq!(first, vec![r[0], r[1]]);
}

#[test]
fn test_bucket_order_is_first_submission_order() {
    let r = keys(3);
    let t = techniques(2);
    let mut queue = RenderQueue::new();

    queue.push(r[0], t[1]);
    queue.push(r[1], t[0]);
    queue.push(r[2], t[1]);

    let order: Vec<_> = queue.buckets().iter().map(|b| b.technique).collect();
    assert_eq!(order, vec![t[1], t[0]]);
}

#[test]
fn test_duplicate_submit_merges_instances() {
    let r = keys(1);
    let t = techniques(2);
    let mut queue = RenderQueue::new();

    queue.push_instance(r[0], t[0], instance());
    // a second submit, even under another technique, lands in the same entry
    queue.push_instance(r[0], t[1], instance());

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.bucket_count(), 1);
    assert_eq!(queue.buckets()[0].entries[0].instances.len(), 2);
}

// ============================================================================
// Tests: clearing
// ============================================================================

#[test]
fn test_take_empties_queue() {
    let r = keys(2);
    let t = techniques(1);
    let mut queue = RenderQueue::new();
    queue.push(r[0], t[0]);
    queue.push(r[1], t[0]);

    let buckets = queue.take();

    assert_eq!(buckets.len(), 1);
    assert!(queue.is_empty());
    assert_eq!(queue.bucket_count(), 0);
    assert!(!queue.contains(r[0]));
}

#[test]
fn test_resubmit_after_clear_starts_fresh() {
    let r = keys(1);
    let t = techniques(1);
    let mut queue = RenderQueue::new();
    queue.push_instance(r[0], t[0], instance());
    queue.clear();

    queue.push(r[0], t[0]);

    assert!(queue.buckets()[0].entries[0].instances.is_empty());
}

// ============================================================================
// Tests: contract violations
// ============================================================================

#[test]
#[should_panic(expected = "null technique")]
fn test_null_technique_panics() {
    let r = keys(1);
    RenderQueue::new().push(r[0], TechniqueHandle::default());
}

#[test]
#[should_panic(expected = "null renderable")]
fn test_null_renderable_panics() {
    let t = techniques(1);
    RenderQueue::new().push(RenderableKey::default(), t[0]);
}
