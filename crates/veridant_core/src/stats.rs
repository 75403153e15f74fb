//! crates/veridant_core/src/stats.rs
//!
//! Totals for the admin dashboard.

use crate::domain::DashboardStats;
use crate::ports::{DatabaseService, PortResult};

pub async fn dashboard_stats(db: &dyn DatabaseService) -> PortResult<DashboardStats> {
    Ok(DashboardStats {
        applications: db.count_applications().await?,
        applications_by_status: db.count_applications_by_status().await?,
        certificates: db.count_certificates().await?,
        offer_letters: db.count_offer_letters().await?,
        mous: db.count_mous().await?,
        employees: db.count_employees().await?,
        contacts: db.count_contacts().await?,
        programs: db.count_programs().await?,
    })
}
