//! Nearby attractions: reverse-geocode the caller's position to a city name,
//! then serve curated places for that city sorted by distance.
//!
//! The lookup never fails outward. Any upstream trouble degrades to a
//! generic list so the dashboard always has something to show.

use reqwest::Client;
use safario_core::geo::{Coordinates, format_distance, haversine_m};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

pub const FALLBACK_CITY: &str = "Popular Destinations";
pub const UNKNOWN_AREA: &str = "Your Area";
/// Sent to Nominatim, whose usage policy requires an identifying agent.
pub const NOMINATIM_USER_AGENT: &str = "Safario-Travel-App/1.0";
/// Places returned for a matched city.
pub const MAX_PLACES: usize = 4;

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
  pub name:           String,
  pub description:    String,
  pub image_url:      String,
  pub category:       String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub coordinates:    Option<Coordinates>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distance:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub directions_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyPlaces {
  pub city:   String,
  pub places: Vec<Place>,
}

// ─── Curated table ───────────────────────────────────────────────────────────

struct CuratedPlace {
  name:        &'static str,
  description: &'static str,
  image_url:   &'static str,
  category:    &'static str,
  at:          Coordinates,
}

struct City {
  /// Lowercase match key.
  key:    &'static str,
  name:   &'static str,
  places: &'static [CuratedPlace],
}

const IMG_SCIENCE: &str = "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d";
const IMG_GARDEN: &str = "https://images.unsplash.com/photo-1519331379826-f10be5486c6f";
const IMG_HERITAGE: &str = "https://images.unsplash.com/photo-1564804955013-e02ad9516e6a";
const IMG_STEPWELL: &str = "https://images.unsplash.com/photo-1595658658481-d53d3f999875";
const IMG_MARKET: &str = "https://images.unsplash.com/photo-1555400038-63f5ba517a47";
const IMG_PALACE: &str = "https://images.unsplash.com/photo-1566552881560-0be862a7c445";
const IMG_MUSEUM: &str = "https://images.unsplash.com/photo-1565060169194-19fabf63012c";
const IMG_GATEWAY: &str = "https://images.unsplash.com/photo-1570168007204-dfb528c6958f";
const IMG_LANDMARK: &str = "https://images.unsplash.com/photo-1587474260584-136574528ed5";
const IMG_BEACH: &str = "https://images.unsplash.com/photo-1507525428034-b723cf961d3e";
const IMG_PARK: &str = "https://images.unsplash.com/photo-1562979314-bee7453e911c";
const IMG_TRAVEL: &str = "https://images.unsplash.com/photo-1469854523086-cc02fe5d8800";

const fn place(
  name: &'static str,
  description: &'static str,
  image_url: &'static str,
  category: &'static str,
  lat: f64,
  lng: f64,
) -> CuratedPlace {
  CuratedPlace { name, description, image_url, category, at: Coordinates::new(lat, lng) }
}

const SCIENCE_CITY: CuratedPlace = place(
  "Science City",
  "Interactive science museum with IMAX theater",
  IMG_SCIENCE,
  "Museum",
  23.0707,
  72.5140,
);
const PARIMAL_GARDEN: CuratedPlace = place(
  "Parimal Garden",
  "Beautiful urban garden for relaxation",
  IMG_GARDEN,
  "Park",
  23.0225,
  72.5565,
);
const SABARMATI_ASHRAM: CuratedPlace = place(
  "Sabarmati Ashram",
  "Historic ashram of Mahatma Gandhi",
  IMG_HERITAGE,
  "Historic Site",
  23.0607,
  72.5802,
);
const KANKARIA_LAKE: CuratedPlace =
  place("Kankaria Lake", "Lakefront entertainment zone", IMG_SCIENCE, "Lake", 23.0067, 72.6006);

#[rustfmt::skip]
const CITIES: &[City] = &[
  City {
    key:    "ahmedabad",
    name:   "Ahmedabad",
    places: &[
      SCIENCE_CITY,
      PARIMAL_GARDEN,
      SABARMATI_ASHRAM,
      KANKARIA_LAKE,
      place(
        "Adalaj Stepwell",
        "Ancient intricately carved stepwell",
        IMG_STEPWELL,
        "Monument",
        23.1667,
        72.5833,
      ),
      place(
        "Law Garden Night Market",
        "Famous street food and shopping market",
        IMG_MARKET,
        "Market",
        23.0263,
        72.5601,
      ),
    ],
  },
  City {
    key:    "indore",
    name:   "Indore",
    places: &[
      place("Rajwada Palace", "Historic palace of Holkar dynasty", IMG_PALACE, "Palace", 22.7196, 75.8577),
      place("Sarafa Bazaar", "Famous night food street", IMG_MARKET, "Food Street", 22.7180, 75.8569),
      place("Lal Bagh Palace", "Grand European-style palace", IMG_PALACE, "Palace", 22.7125, 75.8472),
      place("Patalpani Waterfall", "Scenic waterfall near Indore", IMG_SCIENCE, "Waterfall", 22.5747, 75.7775),
      place("Khajrana Ganesh Temple", "Famous Ganesh temple", IMG_HERITAGE, "Temple", 22.7424, 75.9135),
      place("Central Museum", "Historical artifacts and sculptures", IMG_MUSEUM, "Museum", 22.7243, 75.8839),
    ],
  },
  City {
    key:    "mumbai",
    name:   "Mumbai",
    places: &[
      place("Gateway of India", "Iconic arch monument overlooking the sea", IMG_GATEWAY, "Monument", 18.9220, 72.8347),
      place("Marine Drive", "Famous promenade along the coast", IMG_LANDMARK, "Promenade", 18.9432, 72.8235),
      place("Elephanta Caves", "Ancient rock-cut cave temples", IMG_STEPWELL, "Historic Site", 18.9633, 72.9315),
      place("Juhu Beach", "Popular beach with street food", IMG_BEACH, "Beach", 19.0883, 72.8263),
    ],
  },
  City {
    key:    "delhi",
    name:   "Delhi",
    places: &[
      place("India Gate", "War memorial and iconic landmark", IMG_LANDMARK, "Monument", 28.6129, 77.2295),
      place("Red Fort", "Historic Mughal fortress", IMG_PALACE, "Fort", 28.6562, 77.2410),
      place("Qutub Minar", "UNESCO World Heritage Site", IMG_HERITAGE, "Monument", 28.5245, 77.1855),
      place("Lotus Temple", "Bahá'í House of Worship", IMG_HERITAGE, "Temple", 28.5535, 77.2588),
    ],
  },
  City {
    key:    "bangalore",
    name:   "Bangalore",
    places: &[
      place("Lalbagh Botanical Garden", "Historic garden with diverse flora", IMG_GARDEN, "Garden", 12.9507, 77.5848),
      place("Cubbon Park", "Large urban park in the city center", IMG_PARK, "Park", 12.9763, 77.5929),
      place("Bangalore Palace", "Tudor-style architectural marvel", IMG_PALACE, "Palace", 12.9987, 77.5921),
      place("ISKCON Temple", "Beautiful Krishna temple", IMG_HERITAGE, "Temple", 13.0106, 77.5514),
    ],
  },
  City {
    key:    "jaipur",
    name:   "Jaipur",
    places: &[
      place("Hawa Mahal", "Palace of Winds with unique facade", IMG_HERITAGE, "Palace", 26.9239, 75.8267),
      place("Amber Fort", "Majestic hilltop fort", IMG_PALACE, "Fort", 26.9855, 75.8513),
      place("City Palace", "Royal palace complex", IMG_PALACE, "Palace", 26.9258, 75.8237),
      place("Jantar Mantar", "Historic astronomical observation site", IMG_HERITAGE, "Monument", 26.9248, 75.8246),
    ],
  },
  City {
    key:    "gujarat",
    name:   "Gujarat",
    places: &[SCIENCE_CITY, PARIMAL_GARDEN, SABARMATI_ASHRAM, KANKARIA_LAKE],
  },
];

const DEFAULT_PLACES: [(&str, &str, &str, &str); 4] = [
  ("Nearest Tourist Spot", "Explore your surroundings", IMG_TRAVEL, "Attraction"),
  ("Local Heritage Site", "Discover local history", IMG_HERITAGE, "Historic"),
  ("City Park", "Relax in nature", IMG_GARDEN, "Park"),
  ("Local Market", "Experience local culture", IMG_MARKET, "Market"),
];

// ─── Matching ────────────────────────────────────────────────────────────────

/// First curated city whose key occurs in the lowercased name, or whose key
/// contains the lowercased name with whitespace removed. Blank names match
/// nothing.
fn match_city(name: &str) -> Option<&'static City> {
  let lowered = name.trim().to_lowercase();
  if lowered.is_empty() {
    return None;
  }
  let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
  CITIES
    .iter()
    .find(|city| lowered.contains(city.key) || city.key.contains(compact.as_str()))
}

pub fn directions_url(from: &Coordinates, to: &Coordinates) -> String {
  format!(
    "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}&travelmode=driving",
    from.lat, from.lng, to.lat, to.lng
  )
}

fn search_url(at: &Coordinates) -> String {
  format!("https://www.google.com/maps/search/tourist+attractions/@{},{},14z", at.lat, at.lng)
}

/// The generic list. Search links are only attached when a position is known.
pub fn default_places(user: Option<&Coordinates>) -> Vec<Place> {
  DEFAULT_PLACES
    .iter()
    .map(|(name, description, image_url, category)| Place {
      name:           (*name).to_owned(),
      description:    (*description).to_owned(),
      image_url:      (*image_url).to_owned(),
      category:       (*category).to_owned(),
      coordinates:    None,
      distance:       None,
      directions_url: user.map(search_url),
    })
    .collect()
}

/// Places for a detected city name as seen from `user`.
pub fn places_near(city_name: &str, user: &Coordinates) -> NearbyPlaces {
  let Some(city) = match_city(city_name) else {
    return NearbyPlaces {
      city:   city_name.to_owned(),
      places: default_places(Some(user)),
    };
  };

  let mut ranked: Vec<(f64, &CuratedPlace)> =
    city.places.iter().map(|p| (haversine_m(user, &p.at), p)).collect();
  ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

  let places = ranked
    .into_iter()
    .take(MAX_PLACES)
    .map(|(meters, p)| Place {
      name:           p.name.to_owned(),
      description:    p.description.to_owned(),
      image_url:      p.image_url.to_owned(),
      category:       p.category.to_owned(),
      coordinates:    Some(p.at),
      distance:       Some(format_distance(meters)),
      directions_url: Some(directions_url(user, &p.at)),
    })
    .collect();

  NearbyPlaces { city: city.name.to_owned(), places }
}

pub fn fallback() -> NearbyPlaces {
  NearbyPlaces { city: FALLBACK_CITY.to_owned(), places: default_places(None) }
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PlacesClient {
  client:             Client,
  mapbox_base_url:    String,
  mapbox_token:       Option<String>,
  nominatim_base_url: String,
}

impl PlacesClient {
  pub fn new(
    client: Client,
    mapbox_base_url: &str,
    mapbox_token: Option<String>,
    nominatim_base_url: &str,
  ) -> Self {
    Self {
      client,
      mapbox_base_url: mapbox_base_url.trim_end_matches('/').to_owned(),
      mapbox_token,
      nominatim_base_url: nominatim_base_url.trim_end_matches('/').to_owned(),
    }
  }

  /// Places around `(lat, lng)`. Missing or zero coordinates and any
  /// geocoding failure yield [`fallback`].
  pub async fn lookup(&self, lat: Option<f64>, lng: Option<f64>) -> NearbyPlaces {
    let user = match (lat, lng) {
      (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => Coordinates::new(lat, lng),
      _ => return fallback(),
    };

    match self.city_name(&user).await {
      Ok(city) => {
        tracing::info!(%city, "detected location");
        places_near(&city, &user)
      }
      Err(e) => {
        tracing::warn!(error = %e, "reverse geocoding failed");
        fallback()
      }
    }
  }

  async fn city_name(&self, at: &Coordinates) -> Result<String> {
    match self.mapbox_token.as_deref() {
      Some(token) => self.mapbox_city(at, token).await,
      None => self.nominatim_city(at).await,
    }
  }

  async fn mapbox_city(&self, at: &Coordinates, token: &str) -> Result<String> {
    let url = format!(
      "{}/geocoding/v5/mapbox.places/{},{}.json",
      self.mapbox_base_url, at.lng, at.lat
    );
    let request = self
      .client
      .get(url)
      .query(&[("types", "place,locality,district"), ("access_token", token)]);
    let data = fetch_json("Mapbox", request).await?;

    let feature = &data["features"][0];
    let name = feature["text"]
      .as_str()
      .filter(|s| !s.is_empty())
      .or_else(|| {
        feature["place_name"]
          .as_str()
          .and_then(|s| s.split(',').next())
          .filter(|s| !s.is_empty())
      })
      .unwrap_or(UNKNOWN_AREA);
    Ok(name.to_owned())
  }

  async fn nominatim_city(&self, at: &Coordinates) -> Result<String> {
    let request = self
      .client
      .get(format!("{}/reverse", self.nominatim_base_url))
      .query(&[
        ("format", "json".to_owned()),
        ("lat", at.lat.to_string()),
        ("lon", at.lng.to_string()),
        ("zoom", "10".to_owned()),
        ("addressdetails", "1".to_owned()),
      ])
      .header(reqwest::header::USER_AGENT, NOMINATIM_USER_AGENT);
    let data = fetch_json("Nominatim", request).await?;

    let address = &data["address"];
    let name = ["city", "town", "state_district", "state"]
      .iter()
      .find_map(|field| address[*field].as_str().filter(|s| !s.is_empty()))
      .unwrap_or(UNKNOWN_AREA);
    Ok(name.to_owned())
  }
}

async fn fetch_json(service: &'static str, request: reqwest::RequestBuilder) -> Result<Value> {
  let resp = request
    .send()
    .await
    .map_err(|source| Error::Http { service, source })?;
  if !resp.status().is_success() {
    return Err(Error::Upstream { service, status: resp.status() });
  }
  resp
    .json()
    .await
    .map_err(|e| Error::Malformed { service, reason: e.to_string() })
}
