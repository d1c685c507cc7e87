use serde::{Deserialize, Serialize};

use crate::ticket::Ticket;

/// ユーザーの権限。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Customer,
}

/// 打刻用のチップ。1つのチップは1人のユーザーに紐づく。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chip {
    pub id: String,
    pub user_id: i64,
}

/// アカウント情報。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub tag: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub chips: Vec<Chip>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// `viewer`が`owner_id`のtime entryを閲覧できるかどうかを返す。
pub fn can_view_entries(viewer: &User, owner_id: i64) -> bool {
    viewer.is_admin() || viewer.id == owner_id
}

/// `editor`が`owner_id`のtime entryを編集できるかどうかを返す。顧客は編集できない。
pub fn can_edit_entries(editor: &User, owner_id: i64) -> bool {
    match editor.role {
        Role::Admin => true,
        Role::User => editor.id == owner_id,
        Role::Customer => false,
    }
}

pub fn can_view_ticket(viewer: &User, ticket: &Ticket) -> bool {
    viewer.is_admin() || ticket.involves(viewer.id)
}

/// 状態の変更、非表示の切り替えは閲覧できる人なら誰でも行える。
pub fn can_update_ticket(editor: &User, ticket: &Ticket) -> bool {
    can_view_ticket(editor, ticket) && !ticket.archived
}

/// アーカイブは作成者のみ行える。
pub fn can_archive_ticket(editor: &User, ticket: &Ticket) -> bool {
    editor.id == ticket.creator_id && !ticket.archived
}
