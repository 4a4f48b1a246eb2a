use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use envoy_gateway::{
    Snapshot,
    models::{ensemble::RelayState, production::EnergyTotals},
    quantity::Watts,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

fn totals_row(name: &str, totals: &EnergyTotals) -> Vec<Cell> {
    vec![
        Cell::new(name),
        Cell::new(totals.watts_now).set_alignment(CellAlignment::Right),
        Cell::new(totals.watt_hours_today).set_alignment(CellAlignment::Right),
        Cell::new(totals.watt_hours_last_seven_days).set_alignment(CellAlignment::Right),
        Cell::new(totals.watt_hours_lifetime)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Dim),
    ]
}

#[must_use]
pub fn build_energy_table(snapshot: &Snapshot) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Now", "Today", "7 days", "Lifetime"]);
    let rows = [
        ("Production", &snapshot.production),
        ("Total consumption", &snapshot.total_consumption),
        ("Net consumption", &snapshot.net_consumption),
    ];
    for (name, totals) in rows {
        if let Some(totals) = totals {
            table.add_row(totals_row(name, totals));
        }
    }
    table
}

#[must_use]
pub fn build_inverters_table(snapshot: &Snapshot) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Serial number", "Last report", "Power", "Max", "DC voltage", "Temperature"]);
    for inverter in snapshot.inverters.values() {
        let detail = inverter.detail.as_ref();
        table.add_row(vec![
            Cell::new(&inverter.serial_number),
            Cell::new(inverter.last_report_date.format("%H:%M:%S")).add_attribute(Attribute::Dim),
            Cell::new(inverter.last_report_watts).set_alignment(CellAlignment::Right).fg(
                if inverter.last_report_watts > Watts::zero() { Color::Green } else { Color::Reset },
            ),
            Cell::new(inverter.max_report_watts.map(|watts| watts.to_string()).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
            Cell::new(detail.map(|detail| format!("{:.1} V", detail.dc_voltage)).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
            Cell::new(detail.map(|detail| format!("{:.0} °C", detail.temperature)).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[must_use]
pub fn build_batteries_table(snapshot: &Snapshot) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Serial number", "SoC", "Power", "Temperature"]);
    for battery in snapshot.batteries.values() {
        table.add_row(vec![
            Cell::new(&battery.serial_number),
            Cell::new(format!("{}%", battery.percent_full)).set_alignment(CellAlignment::Right).fg(
                if battery.percent_full >= 20 { Color::Reset } else { Color::Red },
            ),
            Cell::new(battery.real_power.map(|watts| watts.to_string()).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0} °C", battery.temperature)).set_alignment(CellAlignment::Right),
        ]);
    }
    if let Some(enpower) = &snapshot.enpower {
        let color = match enpower.mains_oper_state {
            RelayState::Closed => Color::Green,
            RelayState::Open => Color::DarkYellow,
            RelayState::Unknown => Color::Red,
        };
        table.add_row(vec![
            Cell::new(&enpower.serial_number),
            Cell::new(format!("{:?}", enpower.mains_oper_state)).fg(color),
            Cell::new(""),
            Cell::new(format!("{:.0} °C", enpower.temperature)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
