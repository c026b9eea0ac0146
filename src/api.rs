use crate::{
    jaqc_device_client::{BrokerConfig, ConnectRequest, DeviceClient},
    services::{
        panel::{FieldValues, SettingsPanel, Severity},
        store::SettingsStore,
    },
};
use actix_files::NamedFile;
use actix_web::{HttpResponse, Responder, web};
use anyhow::Result;
use log::{debug, error};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Clone)]
pub struct Api<Device, Store>
where
    Device: DeviceClient,
    Store: SettingsStore,
{
    device_client: Device,
    store: Store,
    panel: Arc<Mutex<SettingsPanel>>,
    index_html: PathBuf,
    submit_on_save: bool,
}

impl<Device, Store> Api<Device, Store>
where
    Device: DeviceClient,
    Store: SettingsStore,
{
    pub fn new(
        device_client: Device,
        store: Store,
        index_html: PathBuf,
        submit_on_save: bool,
    ) -> Result<Self> {
        let mut panel = SettingsPanel::default();
        panel.initialize(&store)?;

        Ok(Api {
            device_client,
            store,
            panel: Arc::new(Mutex::new(panel)),
            index_html,
            submit_on_save,
        })
    }

    fn panel(&self) -> MutexGuard<'_, SettingsPanel> {
        self.panel.lock().unwrap()
    }

    /// Serve the settings page. The panel reinitializes from the store on
    /// every page load, exactly like the page itself does.
    pub async fn index(api: web::Data<Self>) -> actix_web::Result<NamedFile> {
        debug!("index() called");

        if let Err(e) = api.panel().initialize(&api.store) {
            error!("initialize failed: {e:#}");
            return Err(actix_web::error::ErrorInternalServerError(
                "initialize failed",
            ));
        }

        Ok(NamedFile::open(&api.index_html)?)
    }

    pub async fn panel_view(api: web::Data<Self>) -> impl Responder {
        debug!("panel_view() called");

        HttpResponse::Ok().json(api.panel().view())
    }

    pub async fn enter_edit(api: web::Data<Self>) -> impl Responder {
        debug!("enter_edit() called");

        let mut panel = api.panel();
        panel.enter_edit_mode();

        HttpResponse::Ok().json(panel.view())
    }

    pub async fn save(body: web::Json<FieldValues>, api: web::Data<Self>) -> impl Responder {
        debug!("save() called");

        let submitted = body.into_inner();

        {
            let mut panel = api.panel();

            if !api.submit_on_save {
                return match panel.save(&api.store, submitted) {
                    Ok(()) => HttpResponse::Ok().json(panel.view()),
                    Err(e) => {
                        error!("save failed: {e:#}");
                        HttpResponse::InternalServerError().body(e.to_string())
                    }
                };
            }

            if let Err(e) = panel.persist_fields(&api.store, submitted.clone()) {
                error!("save failed: {e:#}");
                return HttpResponse::InternalServerError().body(e.to_string());
            }
        }

        // The store is already durable at this point; the device submit
        // decides how the save ends. The panel lock is not held across the
        // device round trip.
        let result = Self::submit_to_device(&api.device_client, &submitted).await;

        let mut panel = api.panel();
        match result {
            Ok(()) => panel.complete_save(),
            Err(e) => {
                error!("device submit failed: {e:#}");
                panel.fail_save(&e.to_string());
            }
        }

        HttpResponse::Ok().json(panel.view())
    }

    pub async fn cancel(api: web::Data<Self>) -> impl Responder {
        debug!("cancel() called");

        let mut panel = api.panel();
        match panel.cancel(&api.store) {
            Ok(()) => HttpResponse::Ok().json(panel.view()),
            Err(e) => {
                error!("cancel failed: {e:#}");
                HttpResponse::InternalServerError().body(e.to_string())
            }
        }
    }

    /// Ask the device to refresh its served UI assets. On success the page
    /// forces a full reload; on failure only the status slot changes.
    pub async fn update_ui(api: web::Data<Self>) -> impl Responder {
        debug!("update_ui() called");

        match api.device_client.update_ui_assets().await {
            Ok(()) => HttpResponse::Ok().finish(),
            Err(e) => {
                error!("update_ui failed: {e:#}");
                api.panel()
                    .set_status("Could not refresh UI files from device.", Severity::Error);
                HttpResponse::InternalServerError().body(e.to_string())
            }
        }
    }

    pub async fn device_status(api: web::Data<Self>) -> impl Responder {
        debug!("device_status() called");

        match api.device_client.status().await {
            Ok(status) => HttpResponse::Ok().json(status),
            Err(e) => {
                error!("device_status failed: {e:#}");
                HttpResponse::InternalServerError().body(e.to_string())
            }
        }
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }

    async fn submit_to_device(device_client: &Device, fields: &FieldValues) -> Result<()> {
        device_client
            .connect(ConnectRequest {
                ssid: fields.wifi_ssid.clone(),
                pass: fields.wifi_pass.clone(),
            })
            .await?;

        device_client
            .configure_broker(BrokerConfig {
                uri: fields.mqtt_uri.clone(),
                user: fields.mqtt_user.clone(),
                pass: fields.mqtt_pass.clone(),
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jaqc_device_client::MockDeviceClient;
    use crate::services::store::MemSettingsStore;
    use actix_web::{App, dev::ServiceResponse, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};

    type TestApi = Api<MockDeviceClient, MemSettingsStore>;

    fn test_api(device_client: MockDeviceClient, submit_on_save: bool) -> TestApi {
        Api::new(
            device_client,
            MemSettingsStore::default(),
            PathBuf::from("static/index.html"),
            submit_on_save,
        )
        .unwrap()
    }

    async fn create_service(
        api: TestApi,
    ) -> impl actix_service::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    > {
        test::init_service(
            App::new()
                .app_data(Data::new(api))
                .route("/panel", web::get().to(TestApi::panel_view))
                .route("/panel/edit", web::post().to(TestApi::enter_edit))
                .route("/panel/save", web::post().to(TestApi::save))
                .route("/panel/cancel", web::post().to(TestApi::cancel))
                .route("/update-ui", web::post().to(TestApi::update_ui))
                .route("/device-status", web::get().to(TestApi::device_status)),
        )
        .await
    }

    async fn get_panel(
        app: &impl actix_service::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
    ) -> Value {
        let req = test::TestRequest::get().uri("/panel").to_request();
        test::call_and_read_body_json(app, req).await
    }

    #[tokio::test]
    async fn panel_starts_locked_with_empty_fields() {
        let app = create_service(test_api(MockDeviceClient::default(), false)).await;

        let panel = get_panel(&app).await;

        assert_eq!(panel["editMode"], json!(false));
        assert_eq!(panel["fieldsLocked"], json!(true));
        assert_eq!(panel["fields"]["wifiSsid"], json!(""));
        assert_eq!(panel["fields"]["serial"], json!(""));
        assert_eq!(panel["actions"]["edit"], json!(true));
        assert_eq!(panel["actions"]["updateUi"], json!(true));
        assert_eq!(panel["actions"]["save"], json!(false));
    }

    #[tokio::test]
    async fn enter_edit_unlocks_and_swaps_actions() {
        let app = create_service(test_api(MockDeviceClient::default(), false)).await;

        let req = test::TestRequest::post().uri("/panel/edit").to_request();
        let panel: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(panel["editMode"], json!(true));
        assert_eq!(panel["fieldsLocked"], json!(false));
        assert_eq!(panel["actions"]["edit"], json!(false));
        assert_eq!(panel["actions"]["updateUi"], json!(false));
        assert_eq!(panel["actions"]["save"], json!(true));
        assert_eq!(panel["actions"]["cancel"], json!(true));
        assert_eq!(panel["status"]["severity"], json!("info"));
    }

    #[tokio::test]
    async fn save_persists_fields_and_reports_success() {
        let app = create_service(test_api(MockDeviceClient::default(), false)).await;

        let req = test::TestRequest::post().uri("/panel/edit").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/panel/save")
            .set_json(json!({
                "serial": "JQ-0042",
                "wifiSsid": "HomeNet",
                "mqttUri": "mqtt://broker:1883",
            }))
            .to_request();
        let panel: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(panel["editMode"], json!(false));
        assert_eq!(panel["status"]["severity"], json!("ok"));
        assert_eq!(panel["fields"]["wifiSsid"], json!("HomeNet"));
    }

    #[tokio::test]
    async fn cancel_reverts_to_saved_values() {
        let app = create_service(test_api(MockDeviceClient::default(), false)).await;

        let req = test::TestRequest::post()
            .uri("/panel/save")
            .set_json(json!({ "mqttUri": "mqtt://broker:1883" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post().uri("/panel/edit").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post().uri("/panel/cancel").to_request();
        let panel: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(panel["editMode"], json!(false));
        assert_eq!(panel["fields"]["mqttUri"], json!("mqtt://broker:1883"));
        assert_eq!(panel["status"]["severity"], json!("info"));
    }

    #[tokio::test]
    async fn update_ui_failure_sets_error_status_and_non_ok_response() {
        let mut device_client = MockDeviceClient::default();
        device_client
            .expect_update_ui_assets()
            .returning(|| Box::pin(async { Err(anyhow::anyhow!("device unreachable")) }));

        let app = create_service(test_api(device_client, false)).await;

        let req = test::TestRequest::post().uri("/update-ui").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let panel = get_panel(&app).await;
        assert_eq!(panel["status"]["severity"], json!("error"));
        assert_eq!(panel["editMode"], json!(false));
    }

    #[tokio::test]
    async fn update_ui_success_does_not_touch_the_panel() {
        let mut device_client = MockDeviceClient::default();
        device_client
            .expect_update_ui_assets()
            .returning(|| Box::pin(async { Ok(()) }));

        let app = create_service(test_api(device_client, false)).await;

        let req = test::TestRequest::post().uri("/panel/edit").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post().uri("/update-ui").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let panel = get_panel(&app).await;
        assert_eq!(panel["editMode"], json!(true));
    }

    #[tokio::test]
    async fn save_without_device_submit_never_calls_the_device() {
        // MockDeviceClient panics on unexpected calls, which is the assertion
        let app = create_service(test_api(MockDeviceClient::default(), false)).await;

        let req = test::TestRequest::post()
            .uri("/panel/save")
            .set_json(json!({ "wifiSsid": "HomeNet" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn save_with_device_submit_sends_credentials_to_the_device() {
        let mut device_client = MockDeviceClient::default();
        device_client
            .expect_connect()
            .withf(|request| request.ssid == "HomeNet" && request.pass == "hunter2")
            .returning(|_| Box::pin(async { Ok(()) }));
        device_client
            .expect_configure_broker()
            .withf(|config| config.uri == "mqtt://broker:1883" && config.user == "jaqc")
            .returning(|_| Box::pin(async { Ok(()) }));

        let app = create_service(test_api(device_client, true)).await;

        let req = test::TestRequest::post()
            .uri("/panel/save")
            .set_json(json!({
                "wifiSsid": "HomeNet",
                "wifiPass": "hunter2",
                "mqttUri": "mqtt://broker:1883",
                "mqttUser": "jaqc",
                "mqttPass": "secret",
            }))
            .to_request();
        let panel: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(panel["editMode"], json!(false));
        assert_eq!(panel["status"]["severity"], json!("ok"));
    }

    #[tokio::test]
    async fn save_with_failing_device_submit_stays_in_edit_mode() {
        let mut device_client = MockDeviceClient::default();
        device_client
            .expect_connect()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("connect failed")) }));

        let app = create_service(test_api(device_client, true)).await;

        let req = test::TestRequest::post().uri("/panel/edit").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/panel/save")
            .set_json(json!({ "wifiSsid": "HomeNet" }))
            .to_request();
        let panel: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(panel["editMode"], json!(true));
        assert_eq!(panel["status"]["severity"], json!("error"));
        // the store was written before the device submit
        assert_eq!(panel["fields"]["wifiSsid"], json!("HomeNet"));
    }

    #[tokio::test]
    async fn device_status_proxies_the_device_response() {
        let mut device_client = MockDeviceClient::default();
        device_client.expect_status().returning(|| {
            Box::pin(async {
                Ok(crate::jaqc_device_client::DeviceStatus {
                    ssid: Some("HomeNet".to_string()),
                    state: Some("connected".to_string()),
                    ip: Some("192.168.1.50".to_string()),
                })
            })
        });

        let app = create_service(test_api(device_client, false)).await;

        let req = test::TestRequest::get().uri("/device-status").to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(status["ssid"], json!("HomeNet"));
        assert_eq!(status["state"], json!("connected"));
    }
}
