mod support;

use std::sync::Arc;
use std::time::Duration;

use scriptorium::application::posts::{
    ContentError, ContentRepository, CreatePostCommand, MAX_SLUG_RACE_RETRIES, UpdatePostCommand,
};
use scriptorium::cache::{CacheStore, CacheTtls};
use support::{
    CacheOp, Harness, InMemoryImages, InMemoryPosts, RecordingSink, UnavailableCache,
};

fn post(title: &str) -> CreatePostCommand {
    CreatePostCommand {
        title: title.to_string(),
        content: format!("{title} body"),
        image_file_name: "cover.PNG".to_string(),
    }
}

fn retitle(title: &str) -> UpdatePostCommand {
    UpdatePostCommand {
        title: Some(title.to_string()),
        content: None,
    }
}

#[tokio::test]
async fn repeated_titles_receive_numbered_slugs() {
    let h = Harness::new();

    let mut slugs = Vec::new();
    for _ in 0..3 {
        let created = h.content.create(post("Hello World")).await.expect("create");
        slugs.push((created.slug, created.image_path));
    }

    assert_eq!(
        slugs,
        vec![
            ("hello-world".to_string(), "hello-world_image.png".to_string()),
            ("hello-world-1".to_string(), "hello-world-1_image.png".to_string()),
            ("hello-world-2".to_string(), "hello-world-2_image.png".to_string()),
        ]
    );
}

#[tokio::test]
async fn create_rejects_bad_input_before_touching_the_store() {
    let h = Harness::new();

    let cases = [
        CreatePostCommand {
            title: "   ".into(),
            ..post("x")
        },
        CreatePostCommand {
            content: String::new(),
            ..post("Title")
        },
        CreatePostCommand {
            image_file_name: "cover.gif".into(),
            ..post("Title")
        },
        CreatePostCommand {
            image_file_name: "cover".into(),
            ..post("Title")
        },
        post("!!! ???"),
    ];

    for command in cases {
        let result = h.content.create(command.clone()).await;
        assert!(
            matches!(result, Err(ContentError::InvalidInput(_))),
            "{command:?} should be rejected, got {result:?}"
        );
    }
    assert_eq!(h.posts.insert_calls(), 0);
    assert!(h.cache.writes().is_empty());
}

#[tokio::test]
async fn feed_reports_totals_and_page_count() {
    let h = Harness::new();

    let empty = h.content.get_all(1, 10).await.expect("empty feed");
    assert_eq!(empty.total, 0);
    assert_eq!(empty.meta.total_page, 0);
    assert!(empty.blogs.is_empty());

    for title in ["First", "Second", "Third"] {
        h.content.create(post(title)).await.expect("create");
    }

    let page = h.content.get_all(1, 2).await.expect("first page");
    assert_eq!(page.total, 3);
    assert_eq!(page.meta.total_page, 2);
    assert_eq!(page.meta.page, 1);
    assert_eq!(page.meta.limit, 2);
    let titles: Vec<_> = page.blogs.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Third", "Second"]);

    let rest = h.content.get_all(2, 2).await.expect("second page");
    assert_eq!(rest.blogs.len(), 1);
    assert_eq!(rest.blogs[0].title, "First");
}

#[tokio::test]
async fn zero_page_or_limit_is_invalid() {
    let h = Harness::new();
    assert!(matches!(
        h.content.get_all(0, 10).await,
        Err(ContentError::InvalidInput(_))
    ));
    assert!(matches!(
        h.content.get_all(1, 0).await,
        Err(ContentError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn cached_feed_is_served_until_a_write_sweeps_it() {
    let h = Harness::new();
    h.content.create(post("First")).await.expect("create");

    let before = h.content.get_all(1, 10).await.expect("feed");
    assert_eq!(before.total, 1);
    assert!(h.cache.ops().contains(&CacheOp::Set(
        "list:page:1:limit:10".into(),
        Duration::from_secs(600)
    )));

    // A write that bypasses the repository is invisible until invalidation.
    h.posts.insert_directly("Sneaky", "sneaky");
    let stale = h.content.get_all(1, 10).await.expect("cached feed");
    assert_eq!(stale, before);

    h.content.create(post("Second")).await.expect("create");
    let fresh = h.content.get_all(1, 10).await.expect("fresh feed");
    assert_eq!(fresh.total, 3);
}

#[tokio::test]
async fn create_sweeps_every_cached_feed_page() {
    let h = Harness::new();
    h.content.create(post("First")).await.expect("create");
    h.content.get_all(1, 10).await.expect("feed");
    h.content.get_all(1, 5).await.expect("feed");
    h.content.get_all(3, 1).await.expect("feed");

    h.cache.clear_ops();
    h.content.create(post("Second")).await.expect("create");
    assert_eq!(h.cache.writes(), vec![CacheOp::DeletePrefix("list:".into())]);

    for (page, limit) in [(1, 10), (1, 5), (3, 1)] {
        let key = format!("list:page:{page}:limit:{limit}");
        assert_eq!(h.cache.get(&key).await.expect("cache get"), None, "{key}");
    }
}

#[tokio::test]
async fn single_post_is_cached_for_thirty_minutes() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");

    let view = h.content.get_by_slug(&created.slug).await.expect("post");
    assert_eq!(view.title, "Hello World");
    assert_eq!(view.image_path, "hello-world_image.png");
    assert!(h.cache.ops().contains(&CacheOp::Set(
        "slug:hello-world".into(),
        Duration::from_secs(1800)
    )));

    let again = h.content.get_by_slug(&created.slug).await.expect("cached");
    assert_eq!(again, view);

    assert!(matches!(
        h.content.get_by_slug("missing").await,
        Err(ContentError::NotFound)
    ));
}

#[tokio::test]
async fn update_retitles_and_invalidates_old_slug_and_feed() {
    let h = Harness::new();
    let created = h.content.create(post("Old Title")).await.expect("create");
    h.content.get_by_slug("old-title").await.expect("warm post");
    h.content.get_all(1, 10).await.expect("warm feed");

    h.cache.clear_ops();
    let previous = h
        .content
        .update(created.id, retitle("New Title"))
        .await
        .expect("update");
    assert_eq!(previous, "old-title");

    let writes = h.cache.writes();
    assert!(writes.contains(&CacheOp::DeletePrefix("list:".into())));
    assert!(writes.contains(&CacheOp::Delete("slug:old-title".into())));

    assert!(matches!(
        h.content.get_by_slug("old-title").await,
        Err(ContentError::NotFound)
    ));
    let renamed = h.content.get_by_slug("new-title").await.expect("new slug");
    assert_eq!(renamed.title, "New Title");
    assert_eq!(renamed.content, "Old Title body");

    let feed = h.content.get_all(1, 10).await.expect("feed");
    assert_eq!(feed.blogs[0].title, "New Title");
    assert_eq!(feed.blogs[0].slug, "new-title");
}

#[tokio::test]
async fn update_keeps_own_slug_when_title_is_unchanged() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");

    h.content
        .update(created.id, retitle("Hello  World"))
        .await
        .expect("update");

    let rows = h.posts.rows();
    assert_eq!(rows[0].slug, "hello-world");
    assert_eq!(rows[0].title, "Hello  World");
}

#[tokio::test]
async fn update_content_only_leaves_slug_alone() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");

    let previous = h
        .content
        .update(
            created.id,
            UpdatePostCommand {
                title: None,
                content: Some("rewritten".into()),
            },
        )
        .await
        .expect("update");
    assert_eq!(previous, "hello-world");

    let view = h.content.get_by_slug("hello-world").await.expect("post");
    assert_eq!(view.content, "rewritten");
    assert!(view.title == "Hello World");
}

#[tokio::test]
async fn empty_update_is_a_no_op() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");
    h.cache.clear_ops();

    let slug = h
        .content
        .update(created.id, UpdatePostCommand::default())
        .await
        .expect("no-op update");

    assert_eq!(slug, "hello-world");
    assert_eq!(h.posts.update_calls(), 0);
    assert!(h.cache.writes().is_empty());

    assert!(matches!(
        h.content.update(999, UpdatePostCommand::default()).await,
        Err(ContentError::NotFound)
    ));
}

#[tokio::test]
async fn blank_update_fields_are_rejected() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");

    let result = h
        .content
        .update(
            created.id,
            UpdatePostCommand {
                title: Some("  ".into()),
                content: Some(String::new()),
            },
        )
        .await;
    assert!(matches!(result, Err(ContentError::InvalidInput(_))));
    assert_eq!(h.posts.update_calls(), 0);
}

#[tokio::test]
async fn updating_a_missing_post_is_not_found() {
    let h = Harness::new();
    assert!(matches!(
        h.content.update(42, retitle("Anything")).await,
        Err(ContentError::NotFound)
    ));
    assert!(h.cache.writes().is_empty());
}

#[tokio::test]
async fn delete_removes_row_image_and_cached_views() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");
    h.images.put(&created.image_path, b"png");
    h.content.get_by_slug("hello-world").await.expect("warm");

    let slug = h.content.delete(created.id).await.expect("delete");
    assert_eq!(slug, "hello-world");
    assert!(!h.images.contains("hello-world_image.png"));
    assert!(h.posts.rows().is_empty());
    assert!(matches!(
        h.content.get_by_slug("hello-world").await,
        Err(ContentError::NotFound)
    ));
    assert_eq!(h.content.get_all(1, 10).await.expect("feed").total, 0);

    assert!(matches!(
        h.content.delete(created.id).await,
        Err(ContentError::NotFound)
    ));
    assert!(h.sink.failures().is_empty());
}

#[tokio::test]
async fn image_cleanup_failure_does_not_block_delete() {
    let h = Harness::new();
    let created = h.content.create(post("Hello World")).await.expect("create");
    h.images.fail_removals();

    h.content.delete(created.id).await.expect("delete");

    assert!(h.posts.rows().is_empty());
    let failures = h.sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind(), "image_removal");
    assert_eq!(failures[0].subject(), "hello-world_image.png");
}

#[tokio::test]
async fn lost_slug_race_is_retried_with_a_fresh_slug() {
    let h = Harness::new();
    h.posts.lose_slug_races(1);

    let created = h.content.create(post("Hello World")).await.expect("create");

    assert_eq!(created.slug, "hello-world-1");
    assert_eq!(h.posts.insert_calls(), 2);
    assert_eq!(h.posts.rows().len(), 2);
}

#[tokio::test]
async fn persistent_slug_races_end_in_conflict() {
    let h = Harness::new();
    h.posts.lose_slug_races(MAX_SLUG_RACE_RETRIES + 1);

    let result = h.content.create(post("Hello World")).await;

    assert!(matches!(result, Err(ContentError::Conflict(_))));
    assert_eq!(h.posts.insert_calls(), MAX_SLUG_RACE_RETRIES as usize + 1);
    assert!(h.cache.writes().is_empty());
}

#[tokio::test]
async fn update_retries_after_losing_the_new_slug() {
    let h = Harness::new();
    let created = h.content.create(post("Draft")).await.expect("create");
    h.posts.lose_slug_races(1);

    h.content
        .update(created.id, retitle("Final"))
        .await
        .expect("update");

    let row = h
        .posts
        .rows()
        .into_iter()
        .find(|row| row.id == created.id)
        .expect("row");
    assert_eq!(row.slug, "final-1");
    assert_eq!(h.posts.update_calls(), 2);
}

#[tokio::test]
async fn unavailable_cache_degrades_to_store_only() {
    let posts = InMemoryPosts::new();
    let sink = Arc::new(RecordingSink::default());
    let content = ContentRepository::new(
        posts.clone(),
        Arc::new(UnavailableCache),
        Arc::new(InMemoryImages::default()),
        sink.clone(),
        CacheTtls::default(),
    );

    let created = content.create(post("Hello World")).await.expect("create");
    let feed = content.get_all(1, 10).await.expect("feed");
    assert_eq!(feed.total, 1);
    let view = content.get_by_slug("hello-world").await.expect("post");
    assert_eq!(view.id, created.id);
    content
        .update(created.id, retitle("Renamed"))
        .await
        .expect("update");
    content.delete(created.id).await.expect("delete");

    let kinds = sink.kinds();
    for expected in ["cache_read", "cache_write", "cache_invalidate"] {
        assert!(kinds.contains(&expected), "missing {expected} in {kinds:?}");
    }
    assert!(!kinds.contains(&"image_removal"));
}

#[tokio::test]
async fn undecodable_cache_entry_falls_back_to_store() {
    let h = Harness::new();
    h.content.create(post("Hello World")).await.expect("create");
    h.cache
        .set("slug:hello-world", "{not json".into(), Duration::from_secs(60))
        .await
        .expect("seed cache");

    let view = h.content.get_by_slug("hello-world").await.expect("post");
    assert_eq!(view.title, "Hello World");
    assert_eq!(h.sink.kinds(), vec!["cache_decode"]);

    // The refill replaced the corrupt entry.
    let cached = h.cache.get("slug:hello-world").await.expect("get");
    assert!(cached.is_some_and(|raw| raw.contains("Hello World")));
}

#[tokio::test(start_paused = true)]
async fn cached_feed_expires_after_its_ttl() {
    let h = Harness::new();
    h.content.create(post("First")).await.expect("create");
    h.content.get_all(1, 10).await.expect("warm");

    h.posts.insert_directly("Sneaky", "sneaky");
    tokio::time::advance(Duration::from_secs(599)).await;
    assert_eq!(h.content.get_all(1, 10).await.expect("cached").total, 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(h.content.get_all(1, 10).await.expect("expired").total, 2);
}
