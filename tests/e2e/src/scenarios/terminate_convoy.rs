//! Terminating a convoy.

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

    async fn launch_then_destroy(convoy: &Convoy, case: &TestCase) -> Result<(), HarnessError> {
        convoy.create(MANIFEST).await?;
        case.await_container("create", &convoy.container("oneapp")).await;
        case.await_container("create", &convoy.container("twoapp")).await;
        convoy.destroy().await
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn removes_desired_state() {
        scenario("terminate: desired state deleted", |convoy, case| async move {
            launch_then_destroy(&convoy, &case).await?;
            for app in ["oneapp", "twoapp"] {
                case.expect_mutation(
                    Expectation::mutation("delete", convoy.key(&convoy.container(app), "desired"))
                        .within(seconds(6)),
                )?;
            }
            Ok(())
        })
        .await;
    }

    #[tokio::test]
    #[ignore = "requires docker + etcd + navy"]
    async fn brings_down_containers() {
        scenario("terminate: containers destroyed", |convoy, case| async move {
            launch_then_destroy(&convoy, &case).await?;
            for app in ["oneapp", "twoapp"] {
                case.expect_container(
                    Expectation::container("destroy", convoy.container(app)).within(seconds(10)),
                )?;
            }
            Ok(())
        })
        .await;
    }
}
