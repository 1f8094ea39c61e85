//! Waiting for environment dependencies.

#[cfg(test)]
mod tests {
    use crate::harness::scenario;
    use watch_core::Expectation;
    use watch_types::seconds;

    const MANIFEST: &str = "\
apps:
  oneapp:
    image: test_daemon
    links:
      - dep
environments:
  development:
    dependencies:
      dep:
        image: test_daemon
";

    const BROKEN_DEPENDENCY: &str = "\
apps:
  oneapp:
    image: test_daemon
    links:
      - dep
environments:
  development:
    dependencies:
      dep:
        image: bad_item
";

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn marks_dependent_as_waiting() {
        scenario("dependencies: waiting", |convoy, case| async move {
            convoy.create(MANIFEST).await?;
            case.expect_mutation(
                Expectation::mutation("set", convoy.key(&convoy.container("oneapp"), "actual"))
                    .within(seconds(1))
                    .json_including([("state", "waiting")]),
            )?;
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn launches_once_dependency_is_up() {
        scenario("dependencies: running", |convoy, case| async move {
            convoy.create(MANIFEST).await?;
            case.expect_mutation(
                Expectation::mutation("set", convoy.key(&convoy.container("oneapp"), "actual"))
                    .within(seconds(3))
                    .json_including([("state", "running")]),
            )?;
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn failed_dependency_errors_dependent() {
        scenario("dependencies: error propagates", |convoy, case| async move {
            convoy.create(BROKEN_DEPENDENCY).await?;
            case.expect_mutation(
                Expectation::mutation("set", convoy.key(&convoy.dependency("dep"), "actual"))
                    .within(seconds(4))
                    .json_including([("state", "error")]),
            )?;
            case.expect_mutation(
                Expectation::mutation("set", convoy.key(&convoy.container("oneapp"), "actual"))
                    .within(seconds(10))
                    .json_including([("state", "error")]),
            )?;
            Ok(())
        })
        .await;
    }
}
