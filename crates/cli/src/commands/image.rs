// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm pull` / `inspect-image`

use silo_engine::Engine;
use silo_host::engine::{call_checked, call_retry};

pub async fn pull(engine: &Engine) -> anyhow::Result<()> {
    let argv = vec![
        engine.ctx.runtime.binary_str(),
        "pull".to_string(),
        engine.ctx.image.clone(),
    ];
    call_retry(
        engine.services.engine.as_ref(),
        &argv,
        engine.ctx.timeout,
        engine.ctx.retries.max(1),
    )
    .await?;
    println!("pulled {}", engine.ctx.image);
    Ok(())
}

pub async fn inspect(engine: &Engine) -> anyhow::Result<()> {
    let argv = vec![
        engine.ctx.runtime.binary_str(),
        "image".to_string(),
        "inspect".to_string(),
        engine.ctx.image.clone(),
    ];
    let out = call_checked(engine.services.engine.as_ref(), &argv, engine.ctx.timeout).await?;
    println!("{}", out.stdout.trim_end());
    Ok(())
}
