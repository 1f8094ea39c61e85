//! Launching a convoy.

#[cfg(test)]
mod tests {
    use crate::harness::scenario;
    use watch_core::Expectation;

    const MANIFEST: &str = "\
apps:
  oneapp:
    image: test_daemon
";

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn sets_desired_launch_state() {
        scenario("launch: desired state", |convoy, case| async move {
            convoy.create(MANIFEST).await?;
            case.expect_mutation(Expectation::mutation(
                "set",
                convoy.key(&convoy.container("oneapp"), "desired"),
            ))?;
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn launches_application_container() {
        scenario("launch: container started", |convoy, case| async move {
            convoy.create(MANIFEST).await?;
            case.expect_container(Expectation::container("start", convoy.container("oneapp")))?;
            Ok(())
        })
        .await;
    }
}
