//! The mint page: collection details, wallet/mint button, countdown, counts

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{CollectionCatalog, CollectionDisplay};
use crate::config::SaleConfig;
use crate::countdown::{remaining_items, Countdown, GoLiveSource, SaleFlags};
use crate::purchase::{MintOrchestrator, MintReceipt};
use crate::sale_state::{LiveSaleState, SaleStateReader};
use crate::wallet::{WalletAdapter, WalletError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Blocking message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self { message: message.into(), severity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Connect,
    Mint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub label: String,
    pub disabled: bool,
    pub action: ButtonAction,
}

impl ButtonState {
    pub fn derive(flags: &SaleFlags, countdown_text: Option<String>) -> Self {
        if !flags.connected {
            return Self {
                label: "Connect Wallet".to_string(),
                disabled: false,
                action: ButtonAction::Connect,
            };
        }
        let label = if flags.sold_out {
            "SOLD OUT".to_string()
        } else if flags.active {
            if flags.minting { "Minting...".to_string() } else { "MINT".to_string() }
        } else {
            countdown_text.unwrap_or_else(|| "Not scheduled".to_string())
        };
        Self {
            label,
            disabled: !flags.can_mint(),
            action: ButtonAction::Mint,
        }
    }
}

/// Everything needed to draw the page once
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub title: String,
    pub image: String,
    pub description: String,
    pub button: ButtonState,
    pub flags: SaleFlags,
    pub start_date: String,
    pub price_sol: f64,
    pub total_redeemed: Option<u64>,
    pub total_supply: u64,
    pub total_remaining: i128,
    pub balance_sol: Option<f64>,
}

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        if !self.image.is_empty() {
            writeln!(f, "{}", self.image)?;
        }
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        let state = if self.button.disabled { " (disabled)" } else { "" };
        writeln!(f, "[ {} ]{}", self.button.label, state)?;
        writeln!(f, "Start Date: {}", self.start_date)?;
        writeln!(f, "Price (Sol): {}", self.price_sol)?;
        match self.total_redeemed {
            Some(redeemed) => writeln!(f, "Total Redeemed: {}", redeemed)?,
            None => writeln!(f, "Total Redeemed: -")?,
        }
        writeln!(f, "Total Supply: {}", self.total_supply)?;
        write!(f, "Total Remaining: {}", self.total_remaining)?;
        if let Some(balance) = self.balance_sol {
            write!(f, "\nBalance (Sol): {}", balance)?;
        }
        Ok(())
    }
}

pub struct MintView {
    display: CollectionDisplay,
    sale: SaleConfig,
    countdown: Mutex<Countdown>,
    reader: SaleStateReader,
    orchestrator: Arc<MintOrchestrator>,
    wallet: Arc<dyn WalletAdapter>,
}

impl MintView {
    /// Resolve the collection and start the first state refresh
    pub fn mount(
        catalog: &CollectionCatalog,
        id: &str,
        sale: SaleConfig,
        reader: SaleStateReader,
        orchestrator: Arc<MintOrchestrator>,
        wallet: Arc<dyn WalletAdapter>,
        now: DateTime<Utc>,
    ) -> Self {
        let display = CollectionDisplay::resolve(catalog, id);
        let countdown = Countdown::new(display.start_time, now);
        reader.refresh(wallet.pubkey());
        Self {
            display,
            sale,
            countdown: Mutex::new(countdown),
            reader,
            orchestrator,
            wallet,
        }
    }

    pub fn display(&self) -> &CollectionDisplay {
        &self.display
    }

    pub fn reader(&self) -> &SaleStateReader {
        &self.reader
    }

    /// Advance the countdown; true on the tick the sale goes live
    pub fn tick(&self, now: DateTime<Utc>) -> bool {
        let live = self.reader.snapshot();
        let mut countdown = self.countdown.lock();
        if self.sale.go_live_source == GoLiveSource::OnChain {
            if let Some(go_live) = live.counts.and_then(|c| c.go_live) {
                if countdown.start() != Some(go_live) {
                    let was_active = countdown.is_active();
                    countdown.reschedule(Some(go_live), now);
                    return !was_active && countdown.is_active();
                }
            }
        }
        countdown.tick(now)
    }

    pub fn flags(&self, live: &LiveSaleState) -> SaleFlags {
        SaleFlags::derive(
            self.wallet.is_connected(),
            &self.countdown.lock(),
            self.sale.sold_out,
            live.counts.map(|c| c.remaining()),
            self.orchestrator.is_minting(),
        )
    }

    pub fn render(&self, now: DateTime<Utc>) -> ViewModel {
        let live = self.reader.snapshot();
        let flags = self.flags(&live);
        let (start, countdown_text) = {
            let countdown = self.countdown.lock();
            (countdown.start(), countdown.parts(now).map(|p| p.to_string()))
        };
        let redeemed = live.counts.map(|c| c.items_redeemed);

        ViewModel {
            title: self.display.title.clone(),
            image: self.display.image.clone(),
            description: self.display.description.clone(),
            button: ButtonState::derive(&flags, countdown_text),
            flags,
            start_date: start
                .map(|s| s.format("%a %b %d %Y").to_string())
                .unwrap_or_else(|| "-".to_string()),
            price_sol: self.display.price_sol,
            total_redeemed: redeemed,
            total_supply: self.display.total_supply,
            total_remaining: remaining_items(self.display.total_supply, redeemed.unwrap_or(0)),
            balance_sol: live.balance_sol,
        }
    }

    /// Connect the wallet and refresh state for the new identity
    pub async fn connect(&self) -> Result<(), WalletError> {
        let pubkey = self.wallet.connect().await?;
        self.reader.refresh(Some(pubkey));
        Ok(())
    }

    /// Button click: connect when disconnected, otherwise mint if enabled.
    /// Returns the alert to show, if any.
    pub async fn click(&self, now: DateTime<Utc>) -> Option<Alert> {
        let model = self.render(now);
        match model.button.action {
            ButtonAction::Connect => match self.connect().await {
                Ok(()) => None,
                Err(e) => Some(Alert::new(e.to_string(), Severity::Error)),
            },
            ButtonAction::Mint if model.button.disabled => None,
            ButtonAction::Mint => Some(self.mint().await),
        }
    }

    /// Run one mint and translate the outcome into an alert
    pub async fn mint(&self) -> Alert {
        match self.orchestrator.mint(self.wallet.as_ref(), &self.display).await {
            Ok(MintReceipt { signature, mint, .. }) => {
                info!(%signature, %mint, "Mint confirmed");
                self.reader.refresh(self.wallet.pubkey());
                Alert::new(
                    format!("Congratulations! Mint succeeded: {}", mint),
                    Severity::Success,
                )
            }
            Err(e) => {
                warn!(error = %e, "Mint failed");
                Alert::new(e.user_message(), Severity::Error)
            }
        }
    }
}
