//! Terminal login surface.
//!
//! There is no embedded browser in a terminal, so the user opens the login
//! URL in their own browser and pastes back the address of the page they
//! land on.

use async_trait::async_trait;
use fbconnect_core::{LoginOutcome, LoginRequest, LoginSurface};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

pub struct TerminalSurface<R> {
    input: Mutex<R>,
}

impl TerminalSurface<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> TerminalSurface<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }
}

#[async_trait]
impl<R> LoginSurface for TerminalSurface<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn present(&self, request: LoginRequest) -> LoginOutcome {
        eprintln!("Open this page in your browser and log in:\n\n  {}\n", request.url);
        eprintln!("Then paste the address of the page you end up on (empty line to cancel):");

        let mut input = self.input.lock().await;
        loop {
            let mut line = String::new();
            match input.read_line(&mut line).await {
                Ok(0) => return LoginOutcome::Cancelled,
                Ok(_) => {}
                Err(e) => return LoginOutcome::Failed(format!("Failed to read input: {}", e)),
            }

            let pasted = line.trim();
            if pasted.is_empty() {
                return LoginOutcome::Cancelled;
            }
            if !request.is_terminal(pasted) {
                debug!(pasted, "Ignoring non-terminal URL");
                eprintln!("That is not the login result page, try again:");
                continue;
            }
            match fbconnect_core::Url::parse(pasted) {
                Ok(url) => return LoginOutcome::Redirected(url),
                Err(e) => eprintln!("Could not parse that address ({}), try again:", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbconnect_core::auth::login::login_request;
    use fbconnect_core::ClientConfig;

    fn request() -> LoginRequest {
        login_request(&ClientConfig::default(), "app-key").expect("login request")
    }

    #[tokio::test]
    async fn test_pasted_redirect_is_returned() {
        let input = b"https://example.com/elsewhere\nhttps://www.facebook.com/connect/login_success.html?auth_token=abc\n";
        let surface = TerminalSurface::new(&input[..]);

        match surface.present(request()).await {
            LoginOutcome::Redirected(url) => {
                assert_eq!(url.path(), "/connect/login_success.html");
                assert_eq!(url.query(), Some("auth_token=abc"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_line_or_eof_cancels() {
        let surface = TerminalSurface::new(&b"\n"[..]);
        assert_eq!(surface.present(request()).await, LoginOutcome::Cancelled);

        let surface = TerminalSurface::new(&b""[..]);
        assert_eq!(surface.present(request()).await, LoginOutcome::Cancelled);
    }
}
