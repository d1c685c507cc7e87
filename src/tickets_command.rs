use anyhow::{bail, Context, Result};
use log::info;

use crate::access::{can_archive_ticket, can_update_ticket, can_view_ticket};
use crate::client::{TicketUpdate, WorkTimeRepository};
use crate::ticket::{sort_for_listing, Ticket};

/// `tickets`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct TicketsArgs {
    #[clap(long = "all", help = "Include archived and hidden tickets")]
    pub all: bool,

    #[clap(subcommand)]
    pub action: Option<TicketAction>,
}

/// チケットに対する操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Subcommand)]
pub enum TicketAction {
    /// Move a ticket one status forward
    Advance { id: i64 },
    /// Move a ticket one status back
    Revert { id: i64 },
    /// Archive a ticket (creator only)
    Archive { id: i64 },
    /// Hide a ticket from the list
    Hide { id: i64 },
    /// Show a hidden ticket again
    Show { id: i64 },
}

impl TicketAction {
    fn id(&self) -> i64 {
        match self {
            Self::Advance { id }
            | Self::Revert { id }
            | Self::Archive { id }
            | Self::Hide { id }
            | Self::Show { id } => *id,
        }
    }

    /// チケットに対する更新内容を返す。状態を変更できない場合は`None`。
    fn update_for(&self, ticket: &Ticket) -> Option<TicketUpdate> {
        let update = match self {
            Self::Advance { .. } => TicketUpdate {
                status: Some(ticket.status.advance()?),
                ..TicketUpdate::default()
            },
            Self::Revert { .. } => TicketUpdate {
                status: Some(ticket.status.revert()?),
                ..TicketUpdate::default()
            },
            Self::Archive { .. } => TicketUpdate {
                archived: Some(true),
                ..TicketUpdate::default()
            },
            Self::Hide { .. } => TicketUpdate {
                hidden: Some(true),
                ..TicketUpdate::default()
            },
            Self::Show { .. } => TicketUpdate {
                hidden: Some(false),
                ..TicketUpdate::default()
            },
        };
        Some(update)
    }
}

pub struct TicketsCommand<'a, T: WorkTimeRepository> {
    repository: &'a T,
}

impl<'a, T: WorkTimeRepository> TicketsCommand<'a, T> {
    /// 新しい`TicketsCommand`を返す。
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `tickets`サブコマンドの処理を行う。
    ///
    /// 操作が指定されていない場合は閲覧できるチケットを優先度順に返し、
    /// 指定されている場合は更新後のチケットを返す。
    pub async fn run(&self, tickets: TicketsArgs) -> Result<Vec<Ticket>> {
        let user = self
            .repository
            .current_user()
            .await
            .context("Failed to retrieve current user")?;
        let all_tickets = self
            .repository
            .read_tickets()
            .await
            .context("Failed to retrieve tickets")?;

        let Some(action) = tickets.action else {
            let visible: Vec<Ticket> = all_tickets
                .into_iter()
                .filter(|ticket| can_view_ticket(&user, ticket))
                .collect();
            return Ok(sort_for_listing(&visible, tickets.all));
        };

        let id = action.id();
        let ticket = all_tickets
            .iter()
            .find(|ticket| ticket.id == id && can_view_ticket(&user, ticket))
            .with_context(|| format!("Ticket {} not found", id))?;
        let permitted = match action {
            TicketAction::Archive { .. } => can_archive_ticket(&user, ticket),
            _ => can_update_ticket(&user, ticket),
        };
        if !permitted {
            bail!("{} is not allowed to {:?} ticket {}", user.tag, action, id);
        }
        let update = action
            .update_for(ticket)
            .with_context(|| format!("Ticket {} cannot move beyond {}", id, ticket.status))?;

        let updated = self
            .repository
            .update_ticket(id, &update)
            .await
            .with_context(|| format!("Failed to update ticket {}", id))?;
        info!("Ticket {} is now {}", updated.id, updated.status);

        Ok(vec![updated])
    }
}
