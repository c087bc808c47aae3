//! Read-only checks against master data owned by other services.

use diesel::{dsl::exists, prelude::*, select, PgConnection};
use uuid::Uuid;

use crate::models::Vendor;
use crate::schema::{delivery_locations, user_customers, vehicles, vendors};
use crate::status::RecordStatus;

pub fn find_vendor(conn: &mut PgConnection, vendor_id: i64) -> QueryResult<Option<Vendor>> {
    vendors::table.find(vendor_id).first(conn).optional()
}

pub fn vehicle_exists(conn: &mut PgConnection, vehicle_id: i64) -> QueryResult<bool> {
    select(exists(vehicles::table.filter(vehicles::id.eq(vehicle_id)))).get_result(conn)
}

pub fn delivery_location_exists(conn: &mut PgConnection, location_id: i64) -> QueryResult<bool> {
    select(exists(
        delivery_locations::table.filter(delivery_locations::id.eq(location_id)),
    ))
    .get_result(conn)
}

/// The vendor billed for transport on every new dispatch: an active vendor
/// that is neither a loader nor a labour provider. Lowest id wins when more
/// than one qualifies.
pub fn transporter_vendor(conn: &mut PgConnection) -> QueryResult<Option<Vendor>> {
    vendors::table
        .filter(vendors::status.eq(RecordStatus::Active))
        .filter(vendors::is_loader.eq(false))
        .filter(vendors::is_labour.eq(false))
        .order(vendors::id.asc())
        .first(conn)
        .optional()
}

/// Active delivery locations of every customer assigned to `user_id`.
pub fn active_location_ids_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<Vec<i64>> {
    let customer_ids: Vec<i64> = user_customers::table
        .filter(user_customers::user_id.eq(user_id))
        .select(user_customers::customer_id)
        .load(conn)?;

    if customer_ids.is_empty() {
        return Ok(Vec::new());
    }

    delivery_locations::table
        .filter(delivery_locations::customer_id.eq_any(customer_ids))
        .filter(delivery_locations::status.eq(RecordStatus::Active))
        .select(delivery_locations::id)
        .load(conn)
}
