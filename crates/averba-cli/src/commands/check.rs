//! One-shot authorization status probe.

use anyhow::{Context, Result};
use averba_core::gateway::classify::{StatusVerdict, classify_status};
use averba_core::gateway::{AuthorizationGateway, StatusRequest};
use averba_core::subject::{Contact, Cpf};
use secrecy::SecretString;

pub fn run(base_url: &str, token: SecretString, cpf: &str, phone: &str) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    rt.block_on(async {
        let gateway = super::build_gateway(base_url, token)?;
        let request = StatusRequest {
            subject_id: Cpf::parse(cpf).context("invalid CPF")?,
            contact_address: Contact::parse(phone).context("invalid phone number")?,
        };

        let report = gateway
            .check_authorization(&request)
            .await
            .context("status probe failed")?;

        match classify_status(report) {
            StatusVerdict::Authorized(payload) => {
                println!("authorized");
                println!("  available margin: {}", payload.margem_disponivel);
                println!("  eligible:         {}", payload.elegivel);
            },
            StatusVerdict::Pending => println!("pending: the subject has not answered yet"),
            StatusVerdict::Expired => println!("expired: the confirmation code lapsed"),
            StatusVerdict::Ineligible(reason) => println!("ineligible: {reason}"),
            StatusVerdict::NotFound(reason) => println!("not found: {reason}"),
            StatusVerdict::Failed(reason) => println!("error: {reason}"),
        }
        Ok(())
    })
}
