//! Composition root for one execution request.
//!
//! Runs the sandbox and the complexity analyzer on the same input and
//! merges their outputs. Both subcomponents absorb their own failures
//! into defined results, so this service has no error path of its own.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task;

use crate::complexity;
use crate::executors::sandbox::Sandbox;
use crate::types::{CodeRequest, CodeResponse};

#[derive(Clone)]
pub struct ExecutionService {
    sandbox: Arc<Sandbox>,
    admission: Arc<Semaphore>,
}

impl ExecutionService {
    /// `max_concurrent` bounds in-flight executions; each one may create
    /// a disposable container, so admission cannot be unbounded.
    pub fn new(sandbox: Sandbox, max_concurrent: usize) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
            admission: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Execute and analyze `request.code`, merging both results.
    ///
    /// The two legs are independent: the analyzer's verdict never gates
    /// execution, and a malformed program yields an "N/A" report next to
    /// whatever the interpreter printed for the same input.
    pub async fn run(&self, request: CodeRequest) -> CodeResponse {
        if request.language != "python" {
            log::warn!(
                "unsupported language tag '{}'; executing as python",
                request.language
            );
        }

        let _permit = self.admission.acquire().await.ok();

        // Parsing is synchronous CPU work; push it off the async worker
        // while the sandbox leg awaits the container.
        let analysis = {
            let code = request.code.clone();
            task::spawn_blocking(move || complexity::analyze(&code))
        };

        let (execution, analysis) = tokio::join!(self.sandbox.execute(&request.code), analysis);
        let (output, error) = execution;

        let complexity = match analysis {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("complexity analysis task failed: {}", e);
                None
            }
        };

        CodeResponse {
            output,
            error,
            complexity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ExecutionService {
        ExecutionService::new(Sandbox::without_isolation(5), 4)
    }

    fn request(code: &str) -> CodeRequest {
        CodeRequest {
            code: code.to_string(),
            language: "python".to_string(),
        }
    }

    #[tokio::test]
    async fn merges_output_and_linear_complexity() {
        let response = service().run(request("for i in range(3): print(i)")).await;
        assert_eq!(response.output, "0\n1\n2\n");
        assert_eq!(response.error, "");
        let report = response.complexity.expect("analysis should run");
        assert_eq!(report.notation, "O(n)");
        assert_eq!(report.max_depth, 1);
        assert_eq!(report.loop_count, 1);
    }

    #[tokio::test]
    async fn malformed_input_fails_both_legs_independently() {
        let response = service().run(request("x = 1 +")).await;
        // The analyzer reports its defined non-result...
        let report = response.complexity.expect("analysis should run");
        assert_eq!(report.notation, "N/A");
        // ...while the interpreter reports its own syntax error.
        assert_eq!(response.output, "");
        assert!(response.error.contains("SyntaxError"));
    }

    #[tokio::test]
    async fn constant_time_code_reports_o1() {
        let response = service().run(request("print('hi')")).await;
        assert_eq!(response.output, "hi\n");
        assert_eq!(response.complexity.unwrap().notation, "O(1)");
    }
}
