use aivis_browser::{
    BrowserActions, BrowserInstance, ChromeLauncher, ChromePool, FingerprintConfig, PoolSettings,
};
use std::time::Duration;

fn pool() -> ChromePool {
    let config = aivis_core::BrowserConfig::default();
    ChromePool::new(
        ChromeLauncher::from_config(&config),
        PoolSettings {
            capacity: 1,
            max_uses: 2,
            acquire_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        },
    )
}

#[tokio::test]
#[ignore = "Requires Chrome browser installed"]
async fn test_pool_launches_chrome() {
    let pool = pool();
    let lease = pool.acquire().await.expect("acquire browser");
    assert!(lease.is_connected());
    pool.release(lease).await;
    pool.close_all().await;
}

#[tokio::test]
#[ignore = "Requires Chrome browser installed"]
async fn test_navigation_and_screenshot() {
    let pool = pool();
    let lease = pool.acquire().await.expect("acquire browser");
    let page = lease.new_page().await.expect("open page");

    page.apply_fingerprint(&FingerprintConfig::randomized())
        .await
        .expect("apply fingerprint");
    page.navigate("https://example.com").await.expect("navigate");

    assert!(page.current_url().await.unwrap().contains("example.com"));
    assert!(page.body_text().await.unwrap().contains("Example Domain"));
    assert!(!page.screenshot().await.unwrap().is_empty());

    page.close().await.expect("close page");
    pool.release(lease).await;
    pool.close_all().await;
}

#[tokio::test]
#[ignore = "Requires Chrome browser installed"]
async fn test_browser_recycled_after_max_uses() {
    let pool = pool();
    for _ in 0..2 {
        let lease = pool.acquire().await.expect("acquire browser");
        pool.release(lease).await;
    }
    assert_eq!(pool.stats().await.total, 0);
    pool.close_all().await;
}
