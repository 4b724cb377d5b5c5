pub mod insert;
pub mod select;

use core::str::FromStr;

use std::io::Write;

use custody_domain::tx::{ActionType as DomainActionType, TxStatus as DomainTxStatus};
use diesel::{
    backend::Backend,
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::Pg,
    serialize::{self, IsNull, Output, ToSql},
};

use crate::persistence::schema::sql_types::{
    ActionType as ActionTypeSql, TxStatus as TxStatusSql,
};

#[derive(Debug, Clone, Copy, AsExpression, FromSqlRow)]
#[diesel(sql_type = ActionTypeSql)]
pub struct ActionType(DomainActionType);

#[derive(Debug, Clone, Copy, AsExpression, FromSqlRow)]
#[diesel(sql_type = TxStatusSql)]
pub struct TxStatus(DomainTxStatus);

impl ActionType {
    pub fn into_inner(self) -> DomainActionType {
        self.0
    }
}

impl TxStatus {
    pub fn into_inner(self) -> DomainTxStatus {
        self.0
    }
}

impl From<DomainActionType> for ActionType {
    fn from(action: DomainActionType) -> Self {
        Self(action)
    }
}

impl From<DomainTxStatus> for TxStatus {
    fn from(status: DomainTxStatus) -> Self {
        Self(status)
    }
}

impl ToSql<ActionTypeSql, Pg> for ActionType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(<&str>::from(self.0).as_bytes())?;

        Ok(IsNull::No)
    }
}

impl FromSql<ActionTypeSql, Pg> for ActionType {
    fn from_sql(bz: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        str::from_utf8(bz.as_bytes())
            .map(FromStr::from_str)?
            .map(Self)
            .map_err(From::from)
    }
}

impl ToSql<TxStatusSql, Pg> for TxStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(<&str>::from(self.0).as_bytes())?;

        Ok(IsNull::No)
    }
}

impl FromSql<TxStatusSql, Pg> for TxStatus {
    fn from_sql(bz: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        str::from_utf8(bz.as_bytes())
            .map(FromStr::from_str)?
            .map(Self)
            .map_err(From::from)
    }
}
