//! Recovering containers that vanish.

#[cfg(test)]
mod tests {
    use crate::harness::{scenario, Convoy, HarnessError};
    use watch_core::{Expectation, TestCase};
    use watch_types::seconds;

    const MANIFEST: &str = "\
apps:
  oneapp:
    image: test_daemon
  twoapp:
    image: test_daemon
";

    const WITH_PRETASK: &str = "\
apps:
  oneapp:
    image: test_daemon
environments:
  development:
    pre:
      oneapp:
      - echo 'atask'
";

    async fn launch_then_kill_twoapp(convoy: &Convoy, case: &TestCase) -> Result<(), HarnessError> {
        convoy.create(MANIFEST).await?;
        case.await_container("start", &convoy.container("oneapp")).await;
        case.await_container("start", &convoy.container("twoapp")).await;
        convoy.kill_container(&convoy.container("twoapp")).await
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn vanished_container_state_is_removed() {
        scenario("recovery: actual state deleted", |convoy, case| async move {
            launch_then_kill_twoapp(&convoy, &case).await?;
            case.expect_mutation(
                Expectation::mutation("delete", convoy.key(&convoy.container("twoapp"), "actual"))
                    .within(seconds(10)),
            )?;
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn vanished_container_is_brought_back() {
        scenario("recovery: container re-created", |convoy, case| async move {
            launch_then_kill_twoapp(&convoy, &case).await?;
            case.reset_container_events().await;
            case.expect_container(
                Expectation::container("create", convoy.container("twoapp")).within(seconds(10)),
            )?;
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn pretask_container_is_not_restored() {
        scenario("recovery: pre-tasks left alone", |convoy, case| async move {
            convoy.create(WITH_PRETASK).await?;
            case.await_container("start", &convoy.pretasks("oneapp")).await;
            case.reset_container_events().await;
            case.expect_container(
                Expectation::container("create", convoy.pretasks("oneapp"))
                    .never()
                    .within(seconds(10)),
            )?;
            Ok(())
        })
        .await;
    }
}
