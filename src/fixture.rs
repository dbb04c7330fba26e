//! Fixtures for tests

use crate::network::{
    Bus, CapacityLimits, Carrier, ConstraintSense, Generator, GlobalConstraint,
    GlobalConstraintType, LV_LIMIT, Line, Link, Load, Network, StorageUnit, Store,
};
use crate::optimisation::{SolveOptions, optimise};
use crate::series::TimeSeries;
use crate::snapshot::{SnapshotWeighting, Snapshots, parse_snapshot};
use crate::technology::Technology;
use crate::units::{Capacity, MoneyPerCapacity, MoneyPerEnergy};
use chrono::TimeDelta;
use indexmap::IndexMap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Number of snapshots in the daily fixtures
const NUM_DAYS: usize = 28;

/// Build a map from components, keyed by their IDs
macro_rules! by_id {
    ($($item:expr),* $(,)?) => {
        [$($item),*].into_iter().map(|item| (item.id.clone(), item)).collect::<IndexMap<_, _>>()
    };
}

/// Four weeks of daily snapshots, each standing for 24 hours
#[fixture]
pub fn daily_snapshots() -> Snapshots {
    let start = parse_snapshot("2013-01-01 00:00:00").unwrap();
    let timestamps = (0..)
        .take(NUM_DAYS)
        .map(|day| start + TimeDelta::days(day))
        .collect();
    let weightings = vec![
        SnapshotWeighting {
            objective: 24.0,
            stores: 24.0,
            generators: 24.0,
        };
        NUM_DAYS
    ];

    Snapshots::new(timestamps, weightings).unwrap()
}

fn bus(id: &str, country: &str, x: f64) -> Bus {
    Bus {
        id: id.into(),
        carrier: "AC".into(),
        country: Some(country.into()),
        x,
        y: 50.0,
        marginal_price: None,
    }
}

fn generator(id: &str, bus: &str, carrier: &str, capacity: CapacityLimits, cost: f64) -> Generator {
    Generator {
        id: id.into(),
        bus: bus.into(),
        carrier: carrier.into(),
        technology: Technology::resolve(carrier, id),
        capacity,
        p_min_pu: 0.0,
        p_max_pu: 1.0,
        p_max_pu_t: None,
        marginal_cost: MoneyPerEnergy(cost),
        capital_cost: MoneyPerCapacity(0.0),
        efficiency: 1.0,
        dispatch: None,
    }
}

fn load(bus: &str, p_set: TimeSeries) -> Load {
    Load {
        id: bus.into(),
        bus: bus.into(),
        p_set,
    }
}

/// An AC line of fixed capacity between two buses
pub fn line(bus0: &str, bus1: &str, s_nom: f64) -> Line {
    Line {
        id: format!("{bus0} - {bus1}").into(),
        bus0: bus0.into(),
        bus1: bus1.into(),
        carrier: "AC".into(),
        technology: Technology::Ac,
        capacity: CapacityLimits::fixed(Capacity(s_nom)),
        s_max_pu: 1.0,
        length: 100.0,
        capital_cost: MoneyPerCapacity(0.0),
        flow: None,
    }
}

/// A series over the daily snapshots repeating with the given period
fn periodic(base: f64, step: f64, period: usize) -> TimeSeries {
    TimeSeries::new(
        (0..NUM_DAYS)
            .map(|day| base + step * (day % period) as f64)
            .collect(),
    )
}

/// A small network of two German buses and one French bus over four weeks.
///
/// Germany relies on run-of-river, nuclear and reservoir hydro, with gas capacity to be built.
/// France exports nuclear power over an AC line and a DC link. Every bus can shed load.
#[fixture]
pub fn network(daily_snapshots: Snapshots) -> Network {
    let mut network = Network::new("three_bus", daily_snapshots);

    network.carriers = [
        ("AC", 0.0),
        ("DC", 0.0),
        ("ror", 0.0),
        ("nuclear", 0.0),
        ("CCGT", 0.36),
        ("hydro", 0.0),
        ("battery", 0.0),
        ("load", 0.0),
    ]
    .into_iter()
    .map(|(id, co2_emissions)| {
        (
            id.into(),
            Carrier {
                id: id.into(),
                co2_emissions,
            },
        )
    })
    .collect();

    network.buses = by_id![
        bus("DE0 0", "DE", 10.0),
        bus("DE0 1", "DE", 11.0),
        bus("FR0 0", "FR", 2.0),
    ];

    let mut ror = generator(
        "DE0 0 ror",
        "DE0 0",
        "ror",
        CapacityLimits::fixed(Capacity(100.0)),
        0.0,
    );
    ror.p_max_pu_t = Some(periodic(0.3, 0.05, 5));
    let mut ccgt = generator(
        "DE0 1 CCGT",
        "DE0 1",
        "CCGT",
        CapacityLimits::extendable(Capacity(0.0), Capacity(f64::INFINITY)),
        25.0,
    );
    ccgt.capital_cost = MoneyPerCapacity(500.0);
    ccgt.efficiency = 0.5;
    network.generators = by_id![
        ror,
        generator(
            "DE0 0 nuclear",
            "DE0 0",
            "nuclear",
            CapacityLimits::fixed(Capacity(150.0)),
            10.0,
        ),
        ccgt,
        generator(
            "FR0 0 nuclear",
            "FR0 0",
            "nuclear",
            CapacityLimits::fixed(Capacity(300.0)),
            8.0,
        ),
        generator(
            "DE0 0 load",
            "DE0 0",
            "load",
            CapacityLimits::fixed(Capacity(1000.0)),
            10_000.0,
        ),
        generator(
            "DE0 1 load",
            "DE0 1",
            "load",
            CapacityLimits::fixed(Capacity(1000.0)),
            10_000.0,
        ),
        generator(
            "FR0 0 load",
            "FR0 0",
            "load",
            CapacityLimits::fixed(Capacity(1000.0)),
            10_000.0,
        ),
    ];

    network.storage_units = by_id![StorageUnit {
        id: "DE0 1 hydro".into(),
        bus: "DE0 1".into(),
        carrier: "hydro".into(),
        technology: Technology::Hydro,
        capacity: CapacityLimits::fixed(Capacity(50.0)),
        max_hours: 200.0,
        efficiency_store: 1.0,
        efficiency_dispatch: 0.9,
        standing_loss: 0.0,
        p_min_pu: 0.0,
        p_max_pu: 1.0,
        state_of_charge_initial: 0.0,
        cyclic_state_of_charge: true,
        cyclic_state_of_charge_per_period: true,
        marginal_cost: MoneyPerEnergy(0.0),
        capital_cost: MoneyPerCapacity(0.0),
        inflow: Some(periodic(20.0, 2.0, 4)),
        p_dispatch: None,
        p_store: None,
        state_of_charge: None,
        spill: None,
        mu_energy_balance: None,
    }];

    network.stores = by_id![Store {
        id: "DE0 0 battery".into(),
        bus: "DE0 0".into(),
        carrier: "battery".into(),
        technology: Technology::Battery,
        capacity: CapacityLimits::fixed(Capacity(200.0)),
        e_initial: 0.0,
        e_cyclic: true,
        standing_loss: 0.0,
        marginal_cost: MoneyPerEnergy(0.0),
        capital_cost: MoneyPerCapacity(0.0),
        energy: None,
        power: None,
    }];

    // Lines may be reinforced within the volume limit below
    let lines = [("0", "DE0 0", "DE0 1", 400.0), ("1", "DE0 0", "FR0 0", 300.0)].map(
        |(id, bus0, bus1, s_nom)| {
            let mut line = line(bus0, bus1, s_nom);
            line.id = id.into();
            line.capacity = CapacityLimits::extendable(Capacity(s_nom), Capacity(f64::INFINITY));
            line.capital_cost = MoneyPerCapacity(10.0);
            line
        },
    );
    network.lines = lines
        .into_iter()
        .map(|line| (line.id.clone(), line))
        .collect();

    network.links = by_id![Link {
        id: "DE0 1 - FR0 0".into(),
        bus0: "DE0 1".into(),
        bus1: "FR0 0".into(),
        carrier: "DC".into(),
        technology: Technology::Dc,
        capacity: CapacityLimits::fixed(Capacity(200.0)),
        p_min_pu: -1.0,
        p_max_pu: 1.0,
        efficiency: 1.0,
        length: 600.0,
        marginal_cost: MoneyPerEnergy(0.0),
        capital_cost: MoneyPerCapacity(0.0),
        flow: None,
    }];

    network.loads = by_id![
        load("DE0 0", periodic(300.0, 10.0, 7)),
        load("DE0 1", TimeSeries::constant(200.0, NUM_DAYS)),
        load("FR0 0", TimeSeries::constant(250.0, NUM_DAYS)),
    ];

    // Existing volume of lines (100 * 700) plus the link (600 * 200), with 10% headroom on lines
    let constraints = [
        GlobalConstraint {
            name: LV_LIMIT.to_string(),
            kind: GlobalConstraintType::TransmissionVolumeExpansionLimit,
            sense: ConstraintSense::LessOrEqual,
            constant: 77_000.0 + 120_000.0,
            carrier_attribute: "AC, DC".to_string(),
        },
        GlobalConstraint {
            name: "CO2Limit".to_string(),
            kind: GlobalConstraintType::PrimaryEnergy,
            sense: ConstraintSense::LessOrEqual,
            constant: 1e9,
            carrier_attribute: "co2_emissions".to_string(),
        },
    ];
    network.global_constraints = constraints
        .into_iter()
        .map(|constraint| (constraint.name.clone(), constraint))
        .collect();

    network
}

/// The network fixture solved with perfect foresight, including storage duals
#[fixture]
pub fn solved_network(mut network: Network) -> Network {
    optimise(&mut network, &SolveOptions::default().with_duals()).unwrap();
    network
}

/// A single German bus with a cheap and an expensive generator, over four hourly snapshots
#[fixture]
pub fn single_bus_network() -> Network {
    let start = parse_snapshot("2013-01-01 00:00:00").unwrap();
    let timestamps = (0..4).map(|hour| start + TimeDelta::hours(hour)).collect();
    let snapshots = Snapshots::with_unit_weightings(timestamps).unwrap();
    let mut network = Network::new("single_bus", snapshots);

    network.carriers = by_id![
        Carrier {
            id: "AC".into(),
            co2_emissions: 0.0,
        },
        Carrier {
            id: "CCGT".into(),
            co2_emissions: 0.36,
        },
    ];
    network.buses = by_id![bus("DE0 0", "DE", 10.0)];
    network.generators = by_id![
        generator(
            "cheap",
            "DE0 0",
            "CCGT",
            CapacityLimits::fixed(Capacity(50.0)),
            10.0,
        ),
        generator(
            "dear",
            "DE0 0",
            "CCGT",
            CapacityLimits::fixed(Capacity(100.0)),
            20.0,
        ),
    ];
    network.loads = by_id![load("DE0 0", TimeSeries::constant(80.0, 4))];

    network
}
