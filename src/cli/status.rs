use std::sync::Arc;

use crate::backend::http::HttpBackend;
use crate::config::Settings;
use crate::error::FlowError;
use crate::model::ApplicantInput;
use crate::reconcile::{CancelToken, PollError, Reconciler};
use crate::render::{OutputFormat, SupportInfo, render_result};

pub async fn status(
    settings: &Settings,
    run_id: &str,
    names: Option<(String, String)>,
    format: &str,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(settings.require_api_url()?)?);
    let reconciler = Reconciler::new(backend, settings);

    let cancel = CancelToken::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    println!("Waiting for the verification outcome of run {run_id}...");
    let polled = reconciler.poll_until_terminal(run_id, &cancel).await;
    on_interrupt.abort();

    let terminal = match polled {
        Ok(payload) => payload,
        Err(PollError::Cancelled) => {
            println!("Cancelled.");
            return Ok(());
        }
        Err(PollError::Timeout { attempts }) => {
            return Err(FlowError::PollTimeout { attempts }.into());
        }
    };

    let applicant = names.map(|(first_name, last_name)| ApplicantInput {
        first_name,
        last_name,
        email: None,
        phone: None,
        citizen: false,
    });
    let result = reconciler
        .fetch_and_merge(run_id, applicant.as_ref(), Some(terminal))
        .await?;

    let rendered = render_result(
        &result,
        &SupportInfo::from_settings(settings),
        OutputFormat::parse(format),
    )?;
    super::emit(&rendered, output)
}
