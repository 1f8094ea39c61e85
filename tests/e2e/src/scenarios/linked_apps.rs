//! Linked applications.

#[cfg(test)]
mod tests {
    use crate::harness::scenario;
    use watch_core::Expectation;
    use watch_types::seconds;

    const MANIFEST: &str = "\
apps:
  oneapp:
    image: test_daemon
  second:
    image: test_daemon
    links:
      - oneapp
";

    const CLUSTER: &str = "dev.lvh.me";

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn launches_both_containers() {
        scenario("linked apps: both created", |convoy, case| async move {
            convoy.create(MANIFEST).await?;
            case.expect_container(
                Expectation::container("create", convoy.container("oneapp")).within(seconds(2)),
            )?;
            case.expect_container(
                Expectation::container("create", convoy.container("second")).within(seconds(2)),
            )?;
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn sets_links_to_host_proxy() {
        scenario("linked apps: proxy links", |convoy, case| async move {
            convoy.create(MANIFEST).await?;
            let link = format!("ONEAPP_HOST_ADDR={}", convoy.host_addr("oneapp", CLUSTER));
            case.expect_container(
                Expectation::container("create", convoy.container("second"))
                    .within(seconds(2))
                    .env_including(link),
            )?;
            Ok(())
        })
        .await;
    }
}
