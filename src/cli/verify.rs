use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::backend::Backend;
use crate::backend::http::HttpBackend;
use crate::config::Settings;
use crate::flow::{FlowController, FlowState};
use crate::model::ApplicantInput;
use crate::render::terminal::render_view;
use crate::render::{OutputFormat, SupportInfo, render_result};
use crate::widget::CaptureWidget;
use crate::widget::terminal::TerminalWidget;

/// Values given on the command line; anything missing is prompted for.
#[derive(Debug, Default, Clone)]
pub struct Prefill {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub citizen: bool,
}

pub async fn verify(
    settings: &Settings,
    prefill: Prefill,
    format: &str,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(settings.require_api_url()?)?);
    settings.require_workflow_id()?;
    let widget: Arc<dyn CaptureWidget> = Arc::new(TerminalWidget);
    let support = SupportInfo::from_settings(settings);

    let mut flow = FlowController::new(backend, widget, settings);
    print!("{}", render_view(flow.state(), &support));
    flow.start();

    let mut prefill = Some(prefill);
    loop {
        print!("{}", render_view(flow.state(), &support));
        let input = read_applicant(prefill.take().unwrap_or_default())?;
        flow.submit(input).await;

        if matches!(flow.state(), FlowState::Form { .. }) {
            // Validation message is shown by the next form render.
            continue;
        }

        if matches!(flow.state(), FlowState::Capture { .. }) {
            let interrupted = tokio::select! {
                _ = flow.run_capture() => false,
                _ = tokio::signal::ctrl_c() => true,
            };
            if interrupted {
                flow.reset();
                println!("\nVerification cancelled.");
                return Ok(());
            }
        }

        match flow.state() {
            FlowState::Result { result } => {
                let rendered = render_result(result, &support, OutputFormat::parse(format))?;
                return super::emit(&rendered, output);
            }
            FlowState::Error { message } => {
                print!("{}", render_view(flow.state(), &support));
                if confirm("Try again?")? {
                    flow.retry();
                    continue;
                }
                let message = message.clone();
                flow.reset();
                anyhow::bail!(message);
            }
            other => {
                tracing::debug!("verification ended in state {}", other);
                return Ok(());
            }
        }
    }
}

fn read_applicant(prefill: Prefill) -> anyhow::Result<ApplicantInput> {
    let first_name = match prefill.first_name {
        Some(v) => v,
        None => prompt("First name")?,
    };
    let last_name = match prefill.last_name {
        Some(v) => v,
        None => prompt("Last name")?,
    };
    let email = match prefill.email {
        Some(v) => Some(v),
        None => Some(prompt("Email (optional)")?),
    };
    let phone = match prefill.phone {
        Some(v) => Some(v),
        None => Some(prompt("Phone, e.g. +40 721 234 567 (optional)")?),
    };
    let citizen = prefill.citizen || confirm("Are you a citizen?")?;

    Ok(ApplicantInput {
        first_name,
        last_name,
        email,
        phone,
        citizen,
    })
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        anyhow::bail!("Input closed");
    }
    Ok(line.trim().to_string())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = prompt(&format!("{question} [y/N]"))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}
