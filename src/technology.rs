//! Technology tags attached to network components.
//!
//! Every generator, storage unit, store, line and link carries a [`Technology`], resolved once when
//! the network is loaded. Scenario transformations select assets by tag rather than by inspecting
//! component names.
use indexmap::IndexSet;
use std::fmt;
use strum::EnumString;

/// The technology (or carrier category) of a network component
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Technology {
    /// Run-of-river hydro
    #[strum(serialize = "ror")]
    Ror,
    /// Nuclear power
    #[strum(serialize = "nuclear")]
    Nuclear,
    /// Reservoir hydro with natural inflow
    #[strum(serialize = "hydro")]
    Hydro,
    /// Pumped hydro storage
    #[strum(serialize = "PHS")]
    PumpedHydro,
    /// Solar photovoltaics
    #[strum(serialize = "solar")]
    Solar,
    /// Onshore wind
    #[strum(serialize = "onwind")]
    OnshoreWind,
    /// Offshore wind
    #[strum(serialize = "offwind", serialize = "offwind-ac", serialize = "offwind-dc")]
    OffshoreWind,
    /// Combined-cycle gas turbine
    #[strum(serialize = "CCGT")]
    Ccgt,
    /// Open-cycle gas turbine
    #[strum(serialize = "OCGT")]
    Ocgt,
    /// Biomass
    #[strum(serialize = "biomass")]
    Biomass,
    /// Hard coal
    #[strum(serialize = "coal")]
    Coal,
    /// Lignite
    #[strum(serialize = "lignite")]
    Lignite,
    /// Oil
    #[strum(serialize = "oil")]
    Oil,
    /// Battery storage
    #[strum(serialize = "battery")]
    Battery,
    /// Hydrogen storage
    #[strum(serialize = "H2")]
    Hydrogen,
    /// Load shedding, modelled as an expensive generator
    #[strum(serialize = "load", serialize = "load shedding", serialize = "load-shedding")]
    LoadShedding,
    /// Alternating current transmission
    #[strum(serialize = "AC")]
    Ac,
    /// Direct current transmission
    #[strum(serialize = "DC")]
    Dc,
    /// Any other technology
    #[strum(default)]
    Other(String),
}

impl Technology {
    /// Resolve the technology of a component from its carrier.
    ///
    /// When the carrier is blank, the last whitespace-separated token of the component name is
    /// used instead (e.g. `"DE0 0 ror"`).
    pub fn resolve(carrier: &str, name: &str) -> Self {
        let carrier = carrier.trim();
        let label = if carrier.is_empty() {
            name.split_whitespace().last().unwrap_or_default()
        } else {
            carrier
        };

        label
            .parse()
            .unwrap_or_else(|_| Technology::Other(label.to_string()))
    }

    /// The canonical name of the technology
    pub fn name(&self) -> &str {
        match self {
            Self::Ror => "ror",
            Self::Nuclear => "nuclear",
            Self::Hydro => "hydro",
            Self::PumpedHydro => "PHS",
            Self::Solar => "solar",
            Self::OnshoreWind => "onwind",
            Self::OffshoreWind => "offwind",
            Self::Ccgt => "CCGT",
            Self::Ocgt => "OCGT",
            Self::Biomass => "biomass",
            Self::Coal => "coal",
            Self::Lignite => "lignite",
            Self::Oil => "oil",
            Self::Battery => "battery",
            Self::Hydrogen => "H2",
            Self::LoadShedding => "load",
            Self::Ac => "AC",
            Self::Dc => "DC",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parse a list of technology names into a set of tags
pub fn parse_technologies<S: AsRef<str>>(names: &[S]) -> IndexSet<Technology> {
    names
        .iter()
        .map(|name| Technology::resolve(name.as_ref(), ""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ror", "DE0 0 ror", Technology::Ror)]
    #[case("", "DE0 0 nuclear", Technology::Nuclear)]
    #[case("Nuclear", "whatever", Technology::Nuclear)]
    #[case("offwind-dc", "DE0 0 offwind-dc", Technology::OffshoreWind)]
    #[case("load", "DE0 0 load", Technology::LoadShedding)]
    #[case("AC", "1", Technology::Ac)]
    #[case("geothermal", "DE0 0 geothermal", Technology::Other("geothermal".into()))]
    fn test_resolve(#[case] carrier: &str, #[case] name: &str, #[case] expected: Technology) {
        assert_eq!(Technology::resolve(carrier, name), expected);
    }

    #[test]
    fn test_resolve_blank() {
        assert_eq!(Technology::resolve("", ""), Technology::Other(String::new()));
    }

    #[test]
    fn test_parse_technologies() {
        let techs = parse_technologies(&["ror", "nuclear", "hydro"]);
        assert_eq!(
            techs.into_iter().collect::<Vec<_>>(),
            [Technology::Ror, Technology::Nuclear, Technology::Hydro]
        );
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(Technology::PumpedHydro.to_string(), "PHS");
        assert_eq!(
            Technology::resolve(&Technology::PumpedHydro.to_string(), ""),
            Technology::PumpedHydro
        );
    }
}
