//! Unit tests for setup commands
#![cfg(unix)]

use super::*;
use std::time::Duration;
use tessera_core::TesseraError;

const PORT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Foreground Command Tests
// ============================================================================

mod foreground_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        let token = LifetimeToken::new();
        let background = run_setup_commands(&[SetupCommand::new("true")], &token, PORT_TIMEOUT)
            .await
            .unwrap();
        assert!(background.is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error_with_stderr() {
        let token = LifetimeToken::new();
        let err = run_setup_commands(
            &[SetupCommand::new("echo tunnel refused >&2; exit 3")],
            &token,
            PORT_TIMEOUT,
        )
        .await
        .unwrap_err();
        assert!(
            matches!(err, TesseraError::Connection(ref msg) if msg.contains("tunnel refused")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_commands_run_in_order_and_stop_at_failure() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let token = LifetimeToken::new();
        let commands = [
            SetupCommand::new("exit 1"),
            SetupCommand::new(format!("touch {}", marker.display())),
        ];
        assert!(run_setup_commands(&commands, &token, PORT_TIMEOUT).await.is_err());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_cancel_abandons_long_command() {
        let token = LifetimeToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = run_setup_commands(&[SetupCommand::new("sleep 30")], &token, PORT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}

// ============================================================================
// Background Command Tests
// ============================================================================

mod background_tests {
    use super::*;

    #[tokio::test]
    async fn test_background_process_stops_on_cancel() {
        let token = LifetimeToken::new();
        let background = run_setup_commands(
            &[SetupCommand::new("sleep 30").background()],
            &token,
            PORT_TIMEOUT,
        )
        .await
        .unwrap();
        assert_eq!(background.len(), 1);
        assert_eq!(background[0].command(), "sleep 30");
        assert!(!background[0].is_finished());

        token.cancel();
        for _ in 0..50 {
            if background[0].is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(background[0].is_finished());
    }
}

// ============================================================================
// Port Wait Tests
// ============================================================================

mod port_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_port_is_ready() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        wait_for_port(port, PORT_TIMEOUT, &LifetimeToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_port_times_out() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = wait_for_port(port, Duration::from_millis(300), &LifetimeToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_command_wait_timeout_overrides_default() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut command = SetupCommand::new("true").wait_port(port);
        command.wait_timeout_secs = Some(0);
        let err = run_setup_commands(&[command], &LifetimeToken::new(), Duration::from_secs(3600))
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::Timeout(_)));
    }
}
