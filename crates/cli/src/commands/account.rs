//! Login, registration, and logout commands.

use soko_storefront::api::Registration;
use soko_storefront::services::{Credentials, account};
use tracing::info;

use super::Context;

pub async fn login(
    ctx: &Context,
    username: String,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.backend()?;
    let credentials = Credentials::new(username, password);
    account::login(ctx.storage(), &client, &credentials).await?;
    info!("Logged in as {}", credentials.username);
    Ok(())
}

pub async fn register(
    ctx: &Context,
    username: String,
    email: String,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.backend()?;
    let registration = Registration {
        username,
        email,
        password,
    };
    account::register(&client, &registration).await?;
    info!(
        "Account {} created. Log in with: soko login -u {} -p <password>",
        registration.username, registration.username
    );
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    account::logout(ctx.storage()).await?;
    info!("Logged out");
    Ok(())
}
