//! Copernicus Data Space Ecosystem (CDSE) OData catalog client (§6.1, §6.5).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mosaic_coverage::RawProduct;
use mosaic_geometry::from_wkt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{catalog::CatalogClient, CatalogError, CatalogQuery, CatalogResult};

const ODATA_BASE_URL: &str = "https://catalogue.dataspace.copernicus.eu/odata/v1/Products";
const TOKEN_URL: &str = "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";

/// Bearer credentials for the CDSE OData API, bootstrapped once at startup
/// (§6.5) and never mutated afterward.
#[derive(Debug, Clone)]
pub enum CdseCredentials {
    AccessToken(String),
    Password { username: String, password: String },
}

impl CdseCredentials {
    /// Read credentials from the process environment. Absence of either
    /// form is a fatal startup error per §6.5.
    pub fn from_env() -> CatalogResult<Self> {
        if let Ok(token) = std::env::var("CDSE_ACCESS_TOKEN") {
            return Ok(CdseCredentials::AccessToken(token));
        }
        let username = std::env::var("CDSE_USERNAME")
            .map_err(|_| CatalogError::AuthFailed("CDSE_ACCESS_TOKEN or CDSE_USERNAME/CDSE_PASSWORD required".into()))?;
        let password = std::env::var("CDSE_PASSWORD")
            .map_err(|_| CatalogError::AuthFailed("CDSE_PASSWORD required alongside CDSE_USERNAME".into()))?;
        Ok(CdseCredentials::Password { username, password })
    }
}

pub struct CdseCatalogClient {
    http: reqwest::Client,
    credentials: CdseCredentials,
}

impl CdseCatalogClient {
    pub fn new(credentials: CdseCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
        }
    }

    async fn bearer_token(&self) -> CatalogResult<String> {
        match &self.credentials {
            CdseCredentials::AccessToken(token) => Ok(token.clone()),
            CdseCredentials::Password { username, password } => {
                #[derive(Deserialize)]
                struct TokenResponse {
                    access_token: String,
                }

                let form = [
                    ("grant_type", "password"),
                    ("client_id", "cdse-public"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                ];
                let response = self
                    .http
                    .post(TOKEN_URL)
                    .form(&form)
                    .send()
                    .await
                    .map_err(|e| CatalogError::AuthFailed(e.to_string()))?;
                let parsed: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| CatalogError::AuthFailed(e.to_string()))?;
                Ok(parsed.access_token)
            }
        }
    }

    fn build_filter(query: &CatalogQuery) -> String {
        format!(
            "Collection/Name eq '{}' and OData.CSC.Intersects(area=geography'{}') and ContentDate/Start ge {} and ContentDate/Start le {} and Attributes/OData.CSC.DoubleAttribute/any(att:att/Name eq 'cloudCover' and att/OData.CSC.DoubleAttribute/Value le {}) and Attributes/OData.CSC.StringAttribute/any(att:att/Name eq 'productType' and att/OData.CSC.StringAttribute/Value eq '{}')",
            query.collection,
            query.aoi_wkt_4326,
            query.start.to_rfc3339(),
            query.end.to_rfc3339(),
            query.max_cloud_cover,
            query.product_type,
        )
    }
}

#[derive(Debug, Deserialize)]
struct ODataAttribute {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ODataProduct {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "ContentLength")]
    content_length: u64,
    #[serde(rename = "ContentDate")]
    content_date: ODataContentDate,
    #[serde(rename = "Footprint")]
    footprint: Option<String>,
    #[serde(rename = "GeoFootprint")]
    geo_footprint: Option<serde_json::Value>,
    #[serde(rename = "Attributes", default)]
    attributes: Vec<ODataAttribute>,
}

#[derive(Debug, Deserialize)]
struct ODataContentDate {
    #[serde(rename = "Start")]
    start: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ODataResponse {
    value: Vec<ODataProduct>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl ODataProduct {
    fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_f64())
    }

    fn attribute_string(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_str())
            .map(str::to_string)
    }

    /// The `Footprint` attribute CDSE returns is WKT in EPSG:4326 (lon/lat
    /// degrees), same as everything else this API reports — left as-is
    /// here. The caller (the job runner) reprojects it into a local metric
    /// plane alongside the AOI before running the coverage pipeline.
    fn into_raw_product(self) -> RawProduct {
        let footprint_proj = self
            .footprint
            .as_deref()
            .and_then(|wkt_text| from_wkt(wkt_text).ok());

        RawProduct {
            id: self.id,
            name: self.name,
            content_length: self.content_length,
            sensing_date: self.content_date.start,
            footprint_proj,
            cloud_cover: self.attribute_f64("cloudCover"),
            product_type: self.attribute_string("productType").unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CatalogClient for CdseCatalogClient {
    async fn search(&self, query: &CatalogQuery) -> CatalogResult<Vec<RawProduct>> {
        let token = self.bearer_token().await?;
        let mut products = Vec::new();
        let mut url = format!(
            "{ODATA_BASE_URL}?$filter={}&$orderby=ContentDate/Start desc&$top=100",
            Self::build_filter(query)
        );

        loop {
            debug!(url = %url, "fetching catalog page");
            let response = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| CatalogError::Request(e.to_string()))?;

            let page: ODataResponse = response
                .json()
                .await
                .map_err(|e| CatalogError::Parse(e.to_string()))?;

            for product in page.value {
                if product.geo_footprint.is_none() && product.footprint.is_none() {
                    warn!(product = %product.name, "product has no footprint, will be dropped by the filter stage");
                }
                products.push(product.into_raw_product());
            }

            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(products)
    }
}
