mod common;

use common::{RecordingProvider, ResolverHarness, VALID_KEY, records};
use searchgate::domain::{Locale, ResultLimit, UserId};
use searchgate::models::{ItemKind, PreferencesPatch};
use searchgate::services::resolver::{NEED_TOKEN_NOTICE_ID, PROVIDER_ERROR_NOTICE_ID};
use searchgate::services::{CacheKey, ProviderError, ResolverSettings};

const U1: UserId = UserId::new(1001);
const U2: UserId = UserId::new(1002);
const U3: UserId = UserId::new(1003);

async fn set_limit(h: &ResolverHarness, user: UserId, limit: i64) {
    h.preferences
        .update(
            user,
            &PreferencesPatch {
                result_limit: Some(ResultLimit::new(limit).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_query_short_circuits() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;

    for query in ["", "   ", "\t\n"] {
        let response = h.resolver.resolve(U2, query).await.unwrap();
        assert!(response.items.is_empty());
        assert_eq!(response.cache_time, 1);
    }
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn no_credential_and_no_cache_yields_registration_notice() {
    let h = ResolverHarness::new().await;

    let response = h.resolver.resolve(U1, "pizza").await.unwrap();

    assert_eq!(response.items.len(), 1);
    let notice = &response.items[0];
    assert_eq!(notice.id, NEED_TOKEN_NOTICE_ID);
    assert_eq!(notice.kind, ItemKind::Notice);
    assert!(notice.description.contains("/token"));
    assert!(notice.url.is_none());

    assert_eq!(h.provider.call_count(), 0);
    assert!(
        h.cache
            .get(&CacheKey::for_query("pizza"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn fresh_entry_serves_everyone_without_provider_calls() {
    let h = ResolverHarness::new().await;
    h.cache
        .put(
            &CacheKey::for_query("pizza"),
            &records(10),
            chrono::Duration::hours(24),
        )
        .await
        .unwrap();
    set_limit(&h, U3, 3).await;

    let default_user = h.resolver.resolve(U1, "pizza").await.unwrap();
    assert_eq!(default_user.items.len(), 5);

    let limited_user = h.resolver.resolve(U3, "pizza").await.unwrap();
    assert_eq!(limited_user.items.len(), 3);
    assert_eq!(limited_user.items[0].url.as_deref(), Some("https://example.com/0"));
    assert_eq!(limited_user.items[2].url.as_deref(), Some("https://example.com/2"));

    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn query_case_and_padding_share_one_entry() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;

    h.resolver.resolve(U2, "Cats").await.unwrap();
    h.resolver.resolve(U2, "cats").await.unwrap();
    h.resolver.resolve(U2, " cats ").await.unwrap();

    assert_eq!(h.provider.call_count(), 1);
    assert_eq!(h.provider.calls()[0].query, "Cats");
}

#[tokio::test]
async fn entries_older_than_ttl_are_refetched() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;

    h.resolver.resolve(U2, "pizza").await.unwrap();

    h.clock.advance(chrono::Duration::hours(24));
    h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.call_count(), 1, "still fresh at exactly 24h");

    h.clock.advance(chrono::Duration::seconds(1));
    h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.call_count(), 2);
}

#[tokio::test]
async fn three_user_scenario() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;
    set_limit(&h, U2, 3).await;
    set_limit(&h, U3, 1).await;

    // U1 has no key and nothing is cached yet.
    let u1 = h.resolver.resolve(U1, "pizza").await.unwrap();
    assert_eq!(u1.items.len(), 1);
    assert_eq!(u1.items[0].id, NEED_TOKEN_NOTICE_ID);
    assert!(
        h.cache
            .get(&CacheKey::for_query("pizza"))
            .await
            .unwrap()
            .is_none()
    );

    // U2 pays for the call.
    let u2 = h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.call_count(), 1);
    assert!(u2.items.len() <= 3);
    assert!(u2.items.iter().all(|i| i.kind == ItemKind::Result));
    let cached = h
        .cache
        .get(&CacheKey::for_query("pizza"))
        .await
        .unwrap()
        .expect("U2's call must populate the cache");

    // U3 has no key but gets the cached set, truncated to their own limit.
    let u3 = h.resolver.resolve(U3, "pizza").await.unwrap();
    assert_eq!(h.provider.call_count(), 1);
    assert_eq!(u3.items.len(), 1);
    assert_eq!(u3.items[0].url.as_deref(), Some(cached.records[0].link.as_str()));
}

#[tokio::test]
async fn upstream_fetch_covers_the_largest_limit() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;
    set_limit(&h, U2, 3).await;
    set_limit(&h, U3, 10).await;

    let u2 = h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(u2.items.len(), 3);
    assert_eq!(h.provider.calls()[0].limit, 10);

    let u3 = h.resolver.resolve(U3, "pizza").await.unwrap();
    assert_eq!(u3.items.len(), 10);
    assert_eq!(h.provider.call_count(), 1);
}

#[tokio::test]
async fn small_fetch_size_still_honours_the_callers_limit() {
    let settings = ResolverSettings {
        fetch_size: 2,
        ..ResolverSettings::default()
    };
    let h = ResolverHarness::with(RecordingProvider::new(), settings).await;
    h.give_credential(1002, VALID_KEY).await;
    set_limit(&h, U2, 4).await;

    let response = h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.calls()[0].limit, 4);
    assert_eq!(response.items.len(), 4);
}

#[tokio::test]
async fn rate_limited_provider_yields_error_notice() {
    let provider = RecordingProvider::failing(ProviderError::http(429, "Quota exceeded for quota metric"));
    let settings = ResolverSettings {
        admin_contact: "@gatekeeper".to_string(),
        ..ResolverSettings::default()
    };
    let h = ResolverHarness::with(provider, settings).await;
    h.give_credential(1002, VALID_KEY).await;

    let response = h.resolver.resolve(U2, "pizza").await.unwrap();

    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].id, PROVIDER_ERROR_NOTICE_ID);
    assert_eq!(response.items[0].kind, ItemKind::Notice);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, U2);
    assert!(sent[0].1.contains("Quota exceeded"));
    assert!(sent[0].1.contains("@gatekeeper"));

    assert!(
        h.cache
            .get(&CacheKey::for_query("pizza"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn failures_are_not_retried_or_cached() {
    let provider = RecordingProvider::failing(ProviderError::transport("Request timed out"));
    let h = ResolverHarness::with(provider, ResolverSettings::default()).await;
    h.give_credential(1002, VALID_KEY).await;

    h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.call_count(), 1);

    // The script is exhausted, so the next call succeeds and is cached.
    let response = h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.call_count(), 2);
    assert_eq!(response.items.len(), 5);
}

#[tokio::test]
async fn thumbnails_follow_preference() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;

    let with = h.resolver.resolve(U2, "pizza").await.unwrap();
    assert!(with.items.iter().all(|i| i.thumbnail_url.is_some()));

    h.preferences
        .update(
            U1,
            &PreferencesPatch {
                show_thumbnail: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let without = h.resolver.resolve(U1, "pizza").await.unwrap();
    assert!(without.items.iter().all(|i| i.thumbnail_url.is_none()));

    let cached = h
        .cache
        .get(&CacheKey::for_query("pizza"))
        .await
        .unwrap()
        .unwrap();
    assert!(cached.records.iter().all(|r| r.thumbnail.is_some()));
}

#[tokio::test]
async fn item_ids_are_fresh_per_response() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;

    let first = h.resolver.resolve(U2, "pizza").await.unwrap();
    let second = h.resolver.resolve(U2, "pizza").await.unwrap();

    for (a, b) in first.items.iter().zip(&second.items) {
        assert_eq!(a.url, b.url);
        assert_ne!(a.id, b.id);
    }
}

#[tokio::test]
async fn locale_is_forwarded_and_optionally_keys_the_cache() {
    let settings = ResolverSettings {
        key_by_locale: true,
        ..ResolverSettings::default()
    };
    let h = ResolverHarness::with(RecordingProvider::new(), settings).await;
    h.give_credential(1002, VALID_KEY).await;
    h.preferences
        .update(
            U2,
            &PreferencesPatch {
                locale: Some(Some(Locale::parse("de").unwrap())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    h.resolver.resolve(U2, "pizza").await.unwrap();
    assert_eq!(h.provider.calls()[0].locale.as_deref(), Some("de"));

    // A user without a locale addresses a different entry.
    let u1 = h.resolver.resolve(U1, "pizza").await.unwrap();
    assert_eq!(u1.items[0].id, NEED_TOKEN_NOTICE_ID);

    let de = Locale::parse("de").unwrap();
    assert!(
        h.cache
            .get(&CacheKey::for_query_in_locale("pizza", Some(&de)))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn empty_provider_answer_is_not_cached() {
    let h = ResolverHarness::new().await;
    h.give_credential(1002, VALID_KEY).await;
    h.provider.push(Ok(Vec::new()));

    let first = h.resolver.resolve(U2, "rare words").await.unwrap();
    assert!(first.items.is_empty());
    assert!(
        h.cache
            .get(&CacheKey::for_query("rare words"))
            .await
            .unwrap()
            .is_none()
    );

    let second = h.resolver.resolve(U2, "rare words").await.unwrap();
    assert_eq!(h.provider.call_count(), 2);
    assert_eq!(second.items.len(), 5);
}
