// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm ls` / `list-networks` / `gather-facts` - JSON inventories

use silo_engine::Engine;

pub async fn ls(engine: &Engine) -> anyhow::Result<()> {
    let entries = engine.list_daemons().await?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

pub async fn list_networks(engine: &Engine) -> anyhow::Result<()> {
    let networks = silo_engine::list_networks(engine.ctx.timeout).await?;
    println!("{}", serde_json::to_string_pretty(&networks)?);
    Ok(())
}

pub fn gather_facts() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&silo_engine::gather_facts())?);
    Ok(())
}
