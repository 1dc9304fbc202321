use super::domain::{
    AssistanceDispatch, AssistanceInfo, DelayInfo, DispatchStatus, HealthStatus,
    OperationalStatus, Vehicle, VehicleId,
};
use crate::geo::GeoPoint;

struct Seed {
    id: &'static str,
    name: &'static str,
    driver: &'static str,
    vehicle_type: &'static str,
    position: (f64, f64),
    location: &'static str,
    status: OperationalStatus,
    dispatch: DispatchStatus,
    free_capacity: u8,
    health: HealthStatus,
}

impl Seed {
    fn build(self) -> Vehicle {
        Vehicle {
            id: VehicleId::new(self.id),
            name: self.name.to_string(),
            driver: self.driver.to_string(),
            vehicle_type: self.vehicle_type.to_string(),
            position: GeoPoint::new(self.position.0, self.position.1),
            location_name: self.location.to_string(),
            status: self.status,
            dispatch_status: self.dispatch,
            free_capacity: self.free_capacity,
            health: self.health,
            delay: None,
            assistance: None,
            destination: None,
            route: Vec::new(),
        }
    }
}

/// Built-in demo fleet used when no CSV snapshot is configured.
pub fn demo_fleet() -> Vec<Vehicle> {
    use DispatchStatus as D;
    use HealthStatus as H;
    use OperationalStatus as S;

    let seeds = [
        Seed {
            id: "TRK-101",
            name: "Volvo FH16",
            driver: "Marta Kowalski",
            vehicle_type: "box_truck",
            position: (41.8781, -87.6298),
            location: "Downtown Distribution Center",
            status: S::Active,
            dispatch: D::Available,
            free_capacity: 80,
            health: H::Normal,
        },
        Seed {
            id: "TRK-102",
            name: "Scania R500",
            driver: "Dev Patel",
            vehicle_type: "reefer",
            position: (41.9742, -87.9073),
            location: "O'Hare Cargo Terminal",
            status: S::Active,
            dispatch: D::Partial,
            free_capacity: 45,
            health: H::Normal,
        },
        Seed {
            id: "TRK-103",
            name: "Freightliner Cascadia",
            driver: "Luis Ortega",
            vehicle_type: "box_truck",
            position: (41.7868, -87.7522),
            location: "Midway Logistics Park",
            status: S::Active,
            dispatch: D::EnRoute,
            free_capacity: 60,
            health: H::Warning,
        },
        Seed {
            id: "TRK-104",
            name: "Kenworth T680",
            driver: "Aisha Bello",
            vehicle_type: "flatbed",
            position: (41.5250, -88.0817),
            location: "Joliet Intermodal Yard",
            status: S::Active,
            dispatch: D::EnRoute,
            free_capacity: 10,
            health: H::Normal,
        },
        Seed {
            id: "TRK-105",
            name: "MAN TGX",
            driver: "Jonas Berg",
            vehicle_type: "box_truck",
            position: (41.7508, -88.1535),
            location: "Naperville Depot",
            status: S::Maintenance,
            dispatch: D::Maintenance,
            free_capacity: 100,
            health: H::Critical,
        },
        Seed {
            id: "TRK-106",
            name: "Peterbilt 579",
            driver: "Grace Kim",
            vehicle_type: "reefer",
            position: (42.0334, -88.0834),
            location: "Schaumburg Cross-Dock",
            status: S::Active,
            dispatch: D::Available,
            free_capacity: 95,
            health: H::Normal,
        },
        Seed {
            id: "TRK-107",
            name: "Mack Anthem",
            driver: "Tomasz Nowak",
            vehicle_type: "flatbed",
            position: (41.5934, -87.3464),
            location: "Gary Steel Terminal",
            status: S::Active,
            dispatch: D::Partial,
            free_capacity: 30,
            health: H::Warning,
        },
        Seed {
            id: "TRK-108",
            name: "Isuzu NQR",
            driver: "Rosa Delgado",
            vehicle_type: "box_truck",
            position: (42.0451, -87.6877),
            location: "Evanston Hub",
            status: S::Inactive,
            dispatch: D::Available,
            free_capacity: 100,
            health: H::Normal,
        },
    ];

    let mut fleet: Vec<Vehicle> = seeds.into_iter().map(Seed::build).collect();

    if let Some(delayed) = fleet.iter_mut().find(|v| v.id.as_str() == "TRK-104") {
        delayed.delay = Some(DelayInfo {
            reason: Some("Road closure on I-55".to_string()),
        });
        delayed.destination = Some("Downtown Distribution Center".to_string());
    }

    if let Some(stranded) = fleet.iter_mut().find(|v| v.id.as_str() == "TRK-107") {
        stranded.assistance = Some(AssistanceInfo {
            issue: Some("Tyre blowout".to_string()),
            dispatch: AssistanceDispatch::Requested,
            responder: None,
        });
    }

    fleet
}
