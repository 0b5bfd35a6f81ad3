use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::list_payslips;
use crate::error::Result;
use crate::fmt::money;

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let slips = list_payslips(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Pay Date", "Items", "Items Total", "Gross", "Net"]);
    for slip in slips {
        table.add_row(vec![
            Cell::new(slip.id),
            Cell::new(slip.pay_date.unwrap_or_default()),
            Cell::new(slip.item_count),
            Cell::new(money(slip.items_total)),
            Cell::new(slip.gross.map(money).unwrap_or_default()),
            Cell::new(slip.net.map(money).unwrap_or_default()),
        ]);
    }
    println!("Payslips\n{table}");
    Ok(())
}
