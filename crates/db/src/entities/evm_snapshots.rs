//! `SeaORM` Entity for evm_snapshots table.
//!
//! Rows are append-only. Figures are canonical decimal strings; the scenario
//! forecast and critical task list are JSON text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "evm_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub as_of: Date,
    pub bac: String,
    pub pv: String,
    pub ev: String,
    pub ac: String,
    pub cpi: String,
    pub spi: String,
    pub cv: String,
    pub sv: String,
    pub eac: String,
    pub etc: String,
    pub vac: String,
    pub tcpi: Option<String>,
    pub performance_status: String,
    pub health_score: String,
    pub forecast_cost: String,
    pub forecast_date: Option<Date>,
    pub forecast: String,
    pub confidence_level: String,
    pub critical_tasks: String,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
