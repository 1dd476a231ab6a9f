use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match firebase_idtoken_cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            for hint in e.suggestions() {
                eprintln!("  hint: {hint}");
            }
            ExitCode::from(2)
        }
    }
}
