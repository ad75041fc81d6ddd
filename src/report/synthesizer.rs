//! Deterministic report template
//!
//! Section order: location header, population, current weather,
//! infrastructure, the five risks, narrative analysis, sources, limitations.
//! Identical bundles always render byte-identical text.

use tracing::debug;

use super::format_es_number;
use crate::models::{
    EmergencyKind, InfrastructureSnapshot, LocationFeature, ReportBundle, RiskAssessment,
    RiskLevel, WeatherSnapshot,
};

const HEALTH_DISPLAY_LIMIT: usize = 5;
const EDUCATION_DISPLAY_LIMIT: usize = 8;
const NAMED_PARK_DISPLAY_LIMIT: usize = 5;
const GROCERY_DISPLAY_LIMIT: usize = 3;

const GROCERY: &[&str] = &["supermarket", "convenience", "greengrocer"];
const FOOD_SERVICE: &[&str] = &["restaurant", "cafe", "fast_food", "bar"];
const RETAIL: &[&str] = &["clothes", "shoes", "mall", "department_store"];
/// Narrower set used for the food-access verdicts
const FOOD_ACCESS: &[&str] = &["supermarket", "convenience"];

const DEFAULT_LIMITATIONS: &str =
    "Este es un análisis preliminar basado en datos públicos disponibles.";

/// Render the full report for a bundle
#[must_use]
pub fn synthesize(bundle: &ReportBundle) -> String {
    let empty = InfrastructureSnapshot::default();
    let snapshot = bundle.snapshot().unwrap_or(&empty);

    let mut report = String::with_capacity(8 * 1024);
    location_section(&mut report, bundle);
    if let Some(weather) = bundle.current_weather() {
        weather_section(&mut report, weather);
    }
    infrastructure_section(&mut report, bundle, snapshot);
    risk_section(&mut report, &bundle.risk);
    analysis_section(&mut report, &bundle.risk, snapshot);
    sources_section(&mut report, &bundle.risk);

    debug!("Report rendered: {} characters", report.chars().count());
    report
}

fn location_section(out: &mut String, bundle: &ReportBundle) {
    out.push_str("# 📊 INFORME DE ANÁLISIS GEOESPACIAL\n\n");
    out.push_str("## 📍 DATOS DE UBICACIÓN\n\n");
    out.push_str(&format!(
        "**Coordenadas:** {}\n",
        bundle.coordinate.format_precise()
    ));
    out.push_str(&format!("**Ubicación:** {}\n", bundle.location_label));

    if let Some(population) = bundle.risk.population.as_ref().filter(|p| p.estimate > 0) {
        out.push_str(&format!(
            "**Población estimada (radio 1km):** {} habitantes\n",
            format_es_number(population.estimate)
        ));
        out.push_str(&format!(
            "**Densidad poblacional:** ~{} hab/km²\n",
            format_es_number(population.density)
        ));
        out.push_str(&format!("*{}*\n", population.note));
    }
    out.push('\n');
}

fn weather_section(out: &mut String, weather: &WeatherSnapshot) {
    out.push_str("## 🌤️ CONDICIONES METEOROLÓGICAS ACTUALES\n\n");
    out.push_str(&format!("**Fecha y hora:** {}\n\n", weather.format_timestamp()));
    out.push_str(&format!("🌡️ **Temperatura:** {}°C\n", weather.temperature));
    out.push_str(&format!("💧 **Humedad:** {}%\n", weather.humidity));
    out.push_str(&format!("🌧️ **Precipitaciones:** {} mm\n", weather.precipitation));
    out.push_str(&format!("☁️ **Nubosidad:** {}%\n", weather.cloud_cover));
    out.push_str(&format!("💨 **Viento:** {}\n", weather.format_wind()));
    out.push_str(&format!("🌈 **Condición:** {}\n\n", weather.weather_description));
    out.push_str("*Datos proporcionados por Open-Meteo API*\n\n");
}

/// Up to `limit` names, then a "+N more" line
fn capped_list(out: &mut String, features: &[LocationFeature], limit: usize) {
    for feature in features.iter().take(limit) {
        out.push_str(&format!("  - {}\n", feature.name));
    }
    if features.len() > limit {
        out.push_str(&format!("  - ... y {} más\n", features.len() - limit));
    }
}

fn none_found(out: &mut String, what: &str) {
    out.push_str(&format!(
        "  - No se encontraron {what} en el radio de búsqueda\n"
    ));
}

fn shops_of<'a>(snapshot: &'a InfrastructureSnapshot, kinds: &[&str]) -> Vec<&'a LocationFeature> {
    snapshot
        .shops
        .iter()
        .filter(|shop| shop.shop_subtype().is_some_and(|s| kinds.contains(&s)))
        .collect()
}

fn infrastructure_section(out: &mut String, bundle: &ReportBundle, snapshot: &InfrastructureSnapshot) {
    out.push_str("## 🏗️ INFRAESTRUCTURA Y SERVICIOS\n\n");

    if let Err(err) = &bundle.infrastructure {
        out.push_str("⚠️ **Advertencia:** No se pudieron obtener datos de infraestructura.\n");
        out.push_str(&format!("*Motivo: {err}*\n\n"));
    }

    out.push_str(&format!(
        "### 🏥 Servicios de Salud ({})\n",
        snapshot.hospitals.len()
    ));
    if snapshot.hospitals.is_empty() {
        none_found(out, "hospitales");
    } else {
        capped_list(out, &snapshot.hospitals, HEALTH_DISPLAY_LIMIT);
    }

    out.push_str(&format!("\n### 🏫 Educación ({})\n", snapshot.schools.len()));
    if snapshot.schools.is_empty() {
        none_found(out, "centros educativos");
    } else {
        capped_list(out, &snapshot.schools, EDUCATION_DISPLAY_LIMIT);
    }

    out.push_str(&format!(
        "\n### 🚨 Servicios de Emergencia ({})\n",
        snapshot.emergency_services.len()
    ));
    if snapshot.emergency_services.is_empty() {
        none_found(out, "servicios de emergencia");
    } else {
        for (kind, heading) in [
            (EmergencyKind::Police, "Policía"),
            (EmergencyKind::FireStation, "Bomberos"),
        ] {
            let stations = snapshot.emergency_of_kind(kind);
            if stations.is_empty() {
                continue;
            }
            out.push_str(&format!("  **{heading}:** {} estación(es)\n", stations.len()));
            for station in stations {
                out.push_str(&format!("    - {}\n", station.name));
            }
        }
    }

    out.push_str(&format!(
        "\n### 🌳 Áreas Verdes y Espacios Recreativos ({})\n",
        snapshot.parks.len()
    ));
    if snapshot.parks.is_empty() {
        none_found(out, "áreas verdes");
    } else {
        let (named, unnamed): (Vec<&LocationFeature>, Vec<&LocationFeature>) =
            snapshot.parks.iter().partition(|park| park.has_name());
        for park in named.iter().take(NAMED_PARK_DISPLAY_LIMIT) {
            out.push_str(&format!("  - {}\n", park.name));
        }
        if !unnamed.is_empty() {
            out.push_str(&format!(
                "  - {} espacios recreativos adicionales\n",
                unnamed.len()
            ));
        }
    }

    out.push_str(&format!(
        "\n### 🏪 Comercio y Servicios ({} establecimientos)\n",
        snapshot.shops.len()
    ));
    if !snapshot.shops.is_empty() {
        let grocery = shops_of(snapshot, GROCERY);
        let food_service = shops_of(snapshot, FOOD_SERVICE);
        let retail = shops_of(snapshot, RETAIL);

        if !grocery.is_empty() {
            out.push_str(&format!(
                "  **Supermercados/Alimentación:** {}\n",
                grocery.len()
            ));
            for shop in grocery.iter().take(GROCERY_DISPLAY_LIMIT) {
                out.push_str(&format!(
                    "    - {} ({})\n",
                    shop.name,
                    shop.shop_subtype().unwrap_or_default()
                ));
            }
        }
        if !food_service.is_empty() {
            out.push_str(&format!(
                "  **Restaurantes/Cafeterías:** {}\n",
                food_service.len()
            ));
        }
        if !retail.is_empty() {
            out.push_str(&format!("  **Tiendas/Comercios:** {}\n", retail.len()));
        }

        let others = snapshot.shops.len() - grocery.len() - food_service.len() - retail.len();
        if others > 0 {
            out.push_str(&format!("  **Otros servicios:** {others}\n"));
        }
    }
}

fn risk_section(out: &mut String, risk: &RiskAssessment) {
    out.push_str("\n## ⚠️ EVALUACIÓN DE RIESGOS\n\n");

    let headings = [
        "🌊 Riesgo de Inundación",
        "🏢 Riesgo Estructural",
        "🔥 Riesgo de Incendio",
        "🌳 Riesgo Ambiental",
        "🌍 Riesgo Sísmico",
    ];
    for (heading, rating) in headings.iter().zip(risk.ratings_in_report_order()) {
        out.push_str(&format!("**{heading}:** {}\n", rating.level));
        out.push_str(&format!("{}\n\n", rating.note));
    }
}

fn analysis_section(out: &mut String, risk: &RiskAssessment, snapshot: &InfrastructureSnapshot) {
    out.push_str("## 📊 ANÁLISIS Y CONCLUSIONES\n\n");
    out.push_str("### Caracterización de la Zona\n");

    let total_infra = snapshot.total_infra();
    let tier = if total_infra > 500 {
        "**zona urbana de muy alta densidad** con extensa infraestructura comercial y de servicios. "
    } else if total_infra > 200 {
        "**zona urbana consolidada** con buena disponibilidad de servicios. "
    } else if total_infra > 50 {
        "**zona urbana moderada** con servicios básicos disponibles. "
    } else {
        "**zona de baja densidad urbana**. "
    };
    out.push_str("La ubicación se encuentra en una ");
    out.push_str(tier);

    out.push_str(match risk.structural.level {
        RiskLevel::Alto => {
            "La zona presenta **alta densidad de infraestructura** lo que indica concentración de actividad económica. \
             Esto puede generar presión sobre servicios públicos y requiere mantenimiento constante.\n\n"
        }
        RiskLevel::Medio => {
            "La densidad de infraestructura es equilibrada, permitiendo un buen funcionamiento urbano.\n\n"
        }
        _ => "La baja densidad de infraestructura sugiere una zona menos urbanizada.\n\n",
    });

    out.push_str(match risk.environmental.level {
        RiskLevel::Bajo => {
            "La **disponibilidad de áreas verdes es favorable**, contribuyendo positivamente a la calidad ambiental y bienestar de los residentes.\n\n"
        }
        RiskLevel::Medio => {
            "Se recomienda aumentar las áreas verdes para mejorar la calidad ambiental.\n\n"
        }
        RiskLevel::Alto => {
            "⚠️ **Déficit de áreas verdes** en la zona. Se recomienda priorizar espacios verdes en el desarrollo urbano.\n\n"
        }
        RiskLevel::Desconocido => "",
    });

    let food_access = shops_of(snapshot, FOOD_ACCESS).len();
    services_summary(out, snapshot, food_access);
    recommendations(out, risk, snapshot);
    suitability(out, risk, snapshot, food_access);
}

fn services_summary(out: &mut String, snapshot: &InfrastructureSnapshot, food_access: usize) {
    out.push_str("### Servicios Disponibles\n");

    let hospitals = snapshot.hospitals.len();
    if hospitals > 0 {
        out.push_str(&format!("✅ Servicios de salud disponibles ({hospitals})\n"));
    } else {
        out.push_str("⚠️ No se detectaron centros de salud cercanos\n");
    }

    let schools = snapshot.schools.len();
    if schools >= 5 {
        out.push_str(&format!("✅ Buena oferta educativa ({schools} centros)\n"));
    } else if schools > 0 {
        out.push_str(&format!("ℹ️ Oferta educativa limitada ({schools} centros)\n"));
    } else {
        out.push_str("⚠️ No se detectaron centros educativos cercanos\n");
    }

    if snapshot.emergency_services.is_empty() {
        out.push_str("⚠️ No se detectaron servicios de emergencia inmediatos\n");
    } else {
        out.push_str("✅ Servicios de emergencia presentes\n");
    }

    if food_access >= 5 {
        out.push_str(&format!(
            "✅ Excelente acceso a comercios de alimentación ({food_access})\n"
        ));
    } else if food_access > 0 {
        out.push_str(&format!("ℹ️ Acceso básico a comercios ({food_access})\n"));
    }
}

fn recommendations(out: &mut String, risk: &RiskAssessment, snapshot: &InfrastructureSnapshot) {
    out.push_str("\n### Recomendaciones:\n");

    if risk.structural.level == RiskLevel::Alto {
        out.push_str("- Priorizar el mantenimiento de infraestructura existente\n");
        out.push_str("- Evaluar capacidad de servicios públicos ante crecimiento\n");
    }
    if matches!(risk.flood.level, RiskLevel::Medio | RiskLevel::Alto) {
        out.push_str("- Implementar sistemas de drenaje adecuados\n");
        out.push_str("- Considerar seguros contra inundaciones\n");
    }
    if risk.environmental.level != RiskLevel::Bajo {
        out.push_str("- Incrementar áreas verdes y espacios públicos\n");
    }
    out.push_str("- Mantener infraestructura de servicios en buen estado\n");
    out.push_str("- Fomentar desarrollo sostenible en futuras construcciones\n");
    if !snapshot.parks.is_empty() {
        out.push_str("- Aprovechar y mantener las áreas verdes existentes\n");
    }
}

fn suitability(
    out: &mut String,
    risk: &RiskAssessment,
    snapshot: &InfrastructureSnapshot,
    food_access: usize,
) {
    out.push_str("\n### Aptitud de la Zona\n");

    let verdicts: Vec<&str> = [
        (snapshot.schools.len() > 5, "✅ Zona familiar (buena oferta educativa)"),
        (food_access >= 5, "✅ Zona con servicios comerciales completos"),
        (snapshot.parks.len() > 5, "✅ Zona con espacios recreativos"),
        (risk.structural.level == RiskLevel::Alto, "✅ Zona comercial activa"),
    ]
    .into_iter()
    .filter_map(|(holds, verdict)| holds.then_some(verdict))
    .collect();

    if verdicts.is_empty() {
        out.push_str("Zona residencial tranquila con servicios básicos\n");
    } else {
        for verdict in verdicts {
            out.push_str(verdict);
            out.push('\n');
        }
    }
    out.push('\n');
}

fn sources_section(out: &mut String, risk: &RiskAssessment) {
    out.push_str("## 🔗 FUENTES DE DATOS\n\n");
    for source in &risk.sources {
        out.push_str(&format!("- {source}\n"));
    }

    out.push_str("\n## ⚠️ LIMITACIONES\n\n");
    if risk.limitations.is_empty() {
        out.push_str(DEFAULT_LIMITATIONS);
    } else {
        out.push_str(&risk.limitations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GeoRiskError, Upstream};
    use crate::models::{Coordinate, FeatureCategory, UNNAMED};
    use crate::risk;

    fn named(category: FeatureCategory, name: &str) -> LocationFeature {
        LocationFeature {
            category,
            name: name.to_string(),
            lat: None,
            lon: None,
        }
    }

    fn shop(subtype: &str, name: &str) -> LocationFeature {
        named(
            FeatureCategory::Shop {
                subtype: subtype.to_string(),
            },
            name,
        )
    }

    fn coordinate() -> Coordinate {
        Coordinate { lat: 40.4168, lon: -3.7038 }
    }

    fn bundle(infrastructure: Result<InfrastructureSnapshot, GeoRiskError>) -> ReportBundle {
        let risk = risk::assess(&infrastructure, coordinate());
        ReportBundle {
            coordinate: coordinate(),
            location_label: "Madrid, España".to_string(),
            infrastructure,
            risk,
            weather: None,
        }
    }

    fn busy_snapshot() -> InfrastructureSnapshot {
        InfrastructureSnapshot {
            hospitals: (1..=7)
                .map(|i| named(FeatureCategory::Hospital, &format!("Hospital {i}")))
                .collect(),
            schools: vec![named(FeatureCategory::School, "CEIP Cervantes")],
            emergency_services: vec![
                named(FeatureCategory::Emergency { kind: EmergencyKind::Police }, "Comisaría Centro"),
                named(FeatureCategory::Emergency { kind: EmergencyKind::FireStation }, "Parque de Bomberos 1"),
            ],
            waterways: vec![named(FeatureCategory::Waterway, "Manzanares")],
            parks: vec![
                named(FeatureCategory::Park, "El Retiro"),
                named(FeatureCategory::Park, UNNAMED),
                named(FeatureCategory::Park, UNNAMED),
            ],
            roads: Vec::new(),
            shops: vec![
                shop("supermarket", "Mercadona"),
                shop("convenience", UNNAMED),
                shop("greengrocer", "Frutas Paco"),
                shop("supermarket", "Dia"),
                shop("cafe", "Café Central"),
                shop("shoes", UNNAMED),
                shop("bakery", UNNAMED),
            ],
        }
    }

    #[test]
    fn test_section_order() {
        let report = synthesize(&bundle(Ok(busy_snapshot())));
        let headings = [
            "# 📊 INFORME DE ANÁLISIS GEOESPACIAL",
            "## 📍 DATOS DE UBICACIÓN",
            "## 🏗️ INFRAESTRUCTURA Y SERVICIOS",
            "### 🏥 Servicios de Salud (7)",
            "### 🏫 Educación (1)",
            "### 🚨 Servicios de Emergencia (2)",
            "### 🌳 Áreas Verdes y Espacios Recreativos (3)",
            "### 🏪 Comercio y Servicios (7 establecimientos)",
            "## ⚠️ EVALUACIÓN DE RIESGOS",
            "**🌊 Riesgo de Inundación:** MEDIO",
            "**🏢 Riesgo Estructural:** BAJO",
            "**🔥 Riesgo de Incendio:** BAJO",
            "**🌳 Riesgo Ambiental:** MEDIO",
            "**🌍 Riesgo Sísmico:** BAJO",
            "## 📊 ANÁLISIS Y CONCLUSIONES",
            "### Servicios Disponibles",
            "### Recomendaciones:",
            "### Aptitud de la Zona",
            "## 🔗 FUENTES DE DATOS",
            "## ⚠️ LIMITACIONES",
        ];
        let mut cursor = 0;
        for heading in headings {
            let found = report[cursor..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing or out of order: {heading}"));
            cursor += found + heading.len();
        }
    }

    #[test]
    fn test_lists_are_capped() {
        let report = synthesize(&bundle(Ok(busy_snapshot())));
        assert!(report.contains("  - Hospital 5\n  - ... y 2 más\n"));
        assert!(!report.contains("Hospital 6"));
        assert!(report.contains("  - El Retiro\n  - 2 espacios recreativos adicionales\n"));
    }

    #[test]
    fn test_emergency_split_by_kind() {
        let report = synthesize(&bundle(Ok(busy_snapshot())));
        assert!(report.contains("  **Policía:** 1 estación(es)\n    - Comisaría Centro\n"));
        assert!(report.contains("  **Bomberos:** 1 estación(es)\n    - Parque de Bomberos 1\n"));
    }

    #[test]
    fn test_shop_buckets() {
        let report = synthesize(&bundle(Ok(busy_snapshot())));
        assert!(report.contains("  **Supermercados/Alimentación:** 4\n"));
        assert!(report.contains("    - Mercadona (supermarket)\n"));
        assert!(report.contains(&format!("    - {UNNAMED} (convenience)\n")));
        assert!(!report.contains("(supermarket)\n    - Dia"));
        assert!(report.contains("  **Restaurantes/Cafeterías:** 1\n"));
        assert!(report.contains("  **Tiendas/Comercios:** 1\n"));
        assert!(report.contains("  **Otros servicios:** 1\n"));
        // greengrocer counts for the listing but not for food access
        assert!(report.contains("ℹ️ Acceso básico a comercios (3)\n"));
    }

    #[test]
    fn test_population_block() {
        let report = synthesize(&bundle(Ok(busy_snapshot())));
        // 7*100 + 1*50 + 7*10 = 820
        assert!(report.contains("**Población estimada (radio 1km):** 820 habitantes\n"));
        assert!(report.contains("**Densidad poblacional:** ~261 hab/km²\n"));

        let empty = synthesize(&bundle(Ok(InfrastructureSnapshot::default())));
        assert!(!empty.contains("Población estimada"));
    }

    #[test]
    fn test_degraded_infrastructure_section() {
        let err = GeoRiskError::unavailable(Upstream::Overpass, "primary: HTTP 504; fallback: HTTP 429");
        let report = synthesize(&bundle(Err(err)));
        assert!(report.contains("⚠️ **Advertencia:** No se pudieron obtener datos de infraestructura.\n"));
        assert!(report.contains("*Motivo: Overpass API unavailable: primary: HTTP 504; fallback: HTTP 429*"));
        assert!(report.contains("### 🏥 Servicios de Salud (0)\n  - No se encontraron hospitales en el radio de búsqueda\n"));
        assert!(report.contains("**🌊 Riesgo de Inundación:** DESCONOCIDO\nNo hay información disponible\n"));
        assert!(report.ends_with(&format!("## ⚠️ LIMITACIONES\n\n{DEFAULT_LIMITATIONS}")));
        assert!(!report.contains(risk::LIMITATIONS));
        assert!(!report.contains("Déficit de áreas verdes"));
    }

    #[test]
    fn test_weather_section_only_when_present() {
        let mut with_weather = bundle(Ok(InfrastructureSnapshot::default()));
        with_weather.weather = Some(Ok(WeatherSnapshot {
            temperature: 21.5,
            humidity: 40.0,
            precipitation: 0.0,
            cloud_cover: 25.0,
            wind_speed: 12.0,
            wind_direction: 180.0,
            weather_description: "Despejado".to_string(),
            timestamp: "2026-10-07T14:30".to_string(),
        }));
        let report = synthesize(&with_weather);
        assert!(report.contains("**Fecha y hora:** 7/10/2026, 14:30:00\n\n"));
        assert!(report.contains("🌡️ **Temperatura:** 21.5°C\n"));
        assert!(report.contains("💨 **Viento:** 12 km/h (dirección 180° S) - Brisa fuerte\n"));

        let mut failed = bundle(Ok(InfrastructureSnapshot::default()));
        failed.weather = Some(Err(GeoRiskError::timeout(Upstream::Weather, "10s")));
        assert!(!synthesize(&failed).contains("CONDICIONES METEOROLÓGICAS"));
    }

    #[test]
    fn test_recommendations_and_suitability() {
        let report = synthesize(&bundle(Ok(InfrastructureSnapshot::default())));
        assert!(report.contains("**zona de baja densidad urbana**. La baja densidad"));
        assert!(report.contains("⚠️ **Déficit de áreas verdes**"));
        assert!(report.contains("- Incrementar áreas verdes y espacios públicos\n"));
        assert!(!report.contains("- Implementar sistemas de drenaje adecuados"));
        assert!(!report.contains("- Aprovechar y mantener"));
        assert!(report.contains("### Aptitud de la Zona\nZona residencial tranquila con servicios básicos\n\n"));

        let busy = synthesize(&bundle(Ok(busy_snapshot())));
        assert!(busy.contains("- Implementar sistemas de drenaje adecuados\n"));
        assert!(busy.contains("- Aprovechar y mantener las áreas verdes existentes\n"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let bundle = bundle(Ok(busy_snapshot()));
        assert_eq!(synthesize(&bundle), synthesize(&bundle));
    }
}
