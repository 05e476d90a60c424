//! Bluedroid GATT adapter.
//!
//! Publishes the GUI characteristic, the model name and the named color
//! outputs as one primary service, and implements [`GattTransport`] on
//! top of GATT notifications.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs; handle routing and link
//!   bookkeeping stay testable on the host.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms        |
//! |----------------|----------------------------------------|--------------|
//! | Model Name     | `928ec7e1-b867-4b7d-904b-d3b8769a7299` | Read         |
//! | LED Info       | `013201e4-0873-4377-8bff-9a2389af3883` | Write+Notify |
//! | GUI            | `013201e4-0873-4377-8bff-9a2389af3884` | Write+Notify |
//! | one per LED    | `identifier(name)`                     | Write        |
//!
//! Bluedroid callbacks are C function pointers and cannot capture state.
//! [`BleRemote::start`] binds a [`Router`] into a process-wide slot that
//! the callbacks read; the router owns the references to the server and
//! the LED registry.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU8, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::{debug, info};

use crate::config::{GuiConfig, Name};
use crate::error::Error;
use crate::identifier::Uuid;
use crate::led::LedRegistry;
use crate::protocol::server::GuiServer;
use crate::protocol::transport::{GattTransport, SendError, SubscriberId};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0xa6a2fc07_815c_4262_97a9_1cef5181a1e4;
pub const CHAR_MODEL_NAME: u128 = 0x928ec7e1_b867_4b7d_904b_d3b8769a7299;
pub const CHAR_LED_INFO: u128 = 0x013201e4_0873_4377_8bff_9a2389af3883;
pub const CHAR_GUI: u128 = 0x013201e4_0873_4377_8bff_9a2389af3884;

/// Client Characteristic Configuration descriptor.
pub const CCCD_UUID: u16 = 0x2902;

/// ATT notification header: opcode + attribute handle.
const ATT_HEADER_LEN: u16 = 3;
const DEFAULT_MTU: u16 = 23;

// ───────────────────────────────────────────────────────────────
// Attribute routing
// ───────────────────────────────────────────────────────────────

/// What an attribute handle is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ModelName,
    LedInfo,
    LedInfoCccd,
    Gui,
    GuiCccd,
    Led(Uuid),
}

impl Role {
    pub fn is_descriptor(self) -> bool {
        matches!(self, Self::LedInfoCccd | Self::GuiCccd)
    }

    /// Characteristic UUID; descriptors use [`CCCD_UUID`] instead.
    pub fn uuid(self) -> Option<Uuid> {
        match self {
            Self::ModelName => Some(Uuid::from_u128(CHAR_MODEL_NAME)),
            Self::LedInfo => Some(Uuid::from_u128(CHAR_LED_INFO)),
            Self::Gui => Some(Uuid::from_u128(CHAR_GUI)),
            Self::Led(id) => Some(id),
            Self::LedInfoCccd | Self::GuiCccd => None,
        }
    }
}

/// Attribute handles of the service, filled in as the stack registers
/// them. Bluedroid adds one attribute at a time, so registration is a
/// queue with at most one attribute in flight.
#[derive(Debug, Default)]
pub struct GattRoutes {
    pending: VecDeque<Role>,
    in_flight: Option<Role>,
    handles: Vec<(u16, Role)>,
}

impl GattRoutes {
    pub fn new(leds: impl IntoIterator<Item = Uuid>) -> Self {
        let mut pending = VecDeque::from([
            Role::ModelName,
            Role::LedInfo,
            Role::LedInfoCccd,
            Role::Gui,
            Role::GuiCccd,
        ]);
        pending.extend(leds.into_iter().map(Role::Led));
        Self {
            pending,
            in_flight: None,
            handles: Vec::new(),
        }
    }

    /// Handles the service needs: one for the service declaration, two
    /// per characteristic, one per descriptor.
    pub fn handle_count(&self) -> u16 {
        let roles = self
            .pending
            .iter()
            .chain(self.in_flight.iter())
            .chain(self.handles.iter().map(|(_, r)| r));
        1 + roles
            .map(|r| if r.is_descriptor() { 1 } else { 2 })
            .sum::<u16>()
    }

    /// Next attribute to register, or `None` while one is still in flight
    /// or once everything is registered.
    pub fn begin_next(&mut self) -> Option<Role> {
        if self.in_flight.is_some() {
            return None;
        }
        self.in_flight = self.pending.pop_front();
        self.in_flight
    }

    /// The stack assigned `handle` to the attribute in flight.
    pub fn complete(&mut self, handle: u16) -> Option<Role> {
        let role = self.in_flight.take()?;
        self.handles.push((handle, role));
        Some(role)
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }

    pub fn role_of(&self, handle: u16) -> Option<Role> {
        self.handles
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, r)| *r)
    }

    pub fn handle_of(&self, role: Role) -> Option<u16> {
        self.handles
            .iter()
            .find(|(_, r)| *r == role)
            .map(|(h, _)| *h)
    }
}

fn cccd_enabled(data: &[u8]) -> bool {
    // bit 0 notify, bit 1 indicate
    data.first().is_some_and(|b| b & 0x03 != 0)
}

// ───────────────────────────────────────────────────────────────
// Transport
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Link {
    mtu: u16,
    congested: bool,
}

/// Link state shared between the stack callbacks and the delivery worker.
///
/// One entry per connected central. The content budget is taken from the
/// smallest MTU among them, so every message fits every link.
pub struct BluedroidTransport {
    links: Mutex<BTreeMap<SubscriberId, Link>>,
    gatts_if: AtomicU8,
    gui_handle: AtomicU16,
}

impl Default for BluedroidTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BluedroidTransport {
    pub fn new() -> Self {
        Self {
            links: Mutex::new(BTreeMap::new()),
            gatts_if: AtomicU8::new(0),
            gui_handle: AtomicU16::new(0),
        }
    }

    fn links(&self) -> MutexGuard<'_, BTreeMap<SubscriberId, Link>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        !self.links().is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.links().len()
    }

    pub fn connections(&self) -> Vec<SubscriberId> {
        self.links().keys().copied().collect()
    }

    /// MTU of `conn`, `None` if it is not connected.
    pub fn mtu(&self, conn: SubscriberId) -> Option<u16> {
        self.links().get(&conn).map(|l| l.mtu)
    }

    fn on_connect(&self, conn: SubscriberId) {
        self.links().insert(
            conn,
            Link {
                mtu: DEFAULT_MTU,
                congested: false,
            },
        );
    }

    fn on_disconnect(&self, conn: SubscriberId) {
        self.links().remove(&conn);
    }

    fn on_mtu(&self, conn: SubscriberId, mtu: u16) {
        if let Some(link) = self.links().get_mut(&conn) {
            link.mtu = mtu.max(DEFAULT_MTU);
        }
    }

    fn on_congest(&self, conn: SubscriberId, congested: bool) {
        if let Some(link) = self.links().get_mut(&conn) {
            link.congested = congested;
        }
    }

    /// Send on an arbitrary attribute handle of the service.
    #[cfg(target_os = "espidf")]
    pub fn indicate(&self, conn: SubscriberId, handle: u16, data: &[u8]) -> Result<(), SendError> {
        use esp_idf_svc::sys::*;
        // SAFETY: the stack copies `data` before returning.
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                self.gatts_if.load(Ordering::Relaxed),
                conn,
                handle,
                data.len() as u16,
                data.as_ptr().cast_mut(),
                false,
            )
        };
        match ret {
            r if r == ESP_OK as i32 => Ok(()),
            r if r == ESP_ERR_NO_MEM as i32 => Err(SendError::BufferFull),
            r => Err(SendError::Io(r)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn indicate(&self, conn: SubscriberId, handle: u16, data: &[u8]) -> Result<(), SendError> {
        debug!(
            "BLE(sim): indicate conn={} handle={} if={} ({} bytes)",
            conn,
            handle,
            self.gatts_if.load(Ordering::Relaxed),
            data.len()
        );
        Ok(())
    }
}

impl GattTransport for BluedroidTransport {
    fn content_budget(&self) -> Option<u16> {
        let mtu = self.links().values().map(|l| l.mtu).min()?;
        Some(mtu.saturating_sub(ATT_HEADER_LEN))
    }

    fn notify(&self, subscriber: SubscriberId, data: &[u8]) -> Result<(), SendError> {
        match self.links().get(&subscriber) {
            None => return Err(SendError::NotConnected),
            Some(link) if link.congested => return Err(SendError::BufferFull),
            Some(_) => {}
        }
        let handle = self.gui_handle.load(Ordering::Relaxed);
        if handle == 0 {
            return Err(SendError::NotConnected);
        }
        self.indicate(subscriber, handle, data)
    }
}

// ───────────────────────────────────────────────────────────────
// Router
// ───────────────────────────────────────────────────────────────

/// Routes stack events to the GUI server and the LED registry.
pub struct Router<T: GattTransport + 'static> {
    link: Arc<BluedroidTransport>,
    server: Arc<GuiServer<T>>,
    leds: Arc<LedRegistry>,
    routes: Mutex<GattRoutes>,
    model_name: Name,
    client_limit: usize,
}

impl<T: GattTransport + 'static> Router<T> {
    pub fn new(
        link: Arc<BluedroidTransport>,
        server: Arc<GuiServer<T>>,
        leds: Arc<LedRegistry>,
        config: &GuiConfig,
    ) -> Self {
        let routes = GattRoutes::new(leds.ids());
        let mut model_name = Name::new();
        let _ = model_name.push_str(config.model_name());
        Self {
            link,
            server,
            leds,
            routes: Mutex::new(routes),
            model_name,
            client_limit: config.effective_client_limit(),
        }
    }

    pub fn link(&self) -> &BluedroidTransport {
        &self.link
    }

    pub fn server(&self) -> &GuiServer<T> {
        &self.server
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn with_routes<R>(&self, f: impl FnOnce(&mut GattRoutes) -> R) -> R {
        f(&mut self.routes.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn on_app_registered(&self, gatts_if: u8) {
        self.link.gatts_if.store(gatts_if, Ordering::Relaxed);
    }

    /// Next attribute to add to the service.
    pub fn register_next(&self) -> Option<Role> {
        self.with_routes(GattRoutes::begin_next)
    }

    /// The stack assigned `handle` to the attribute being added.
    pub fn on_registered(&self, handle: u16) -> Option<Role> {
        let role = self.with_routes(|r| r.complete(handle))?;
        if role == Role::Gui {
            self.link.gui_handle.store(handle, Ordering::Relaxed);
        }
        debug!("BLE: {role:?} on handle {handle}");
        Some(role)
    }

    /// Returns `true` while there is room for another central, i.e.
    /// advertising should continue.
    pub fn on_connect(&self, conn: SubscriberId) -> bool {
        self.link.on_connect(conn);
        let count = self.link.connection_count();
        info!(
            "BLE: central connected (conn_id={conn}, {count}/{} links)",
            self.client_limit
        );
        count < self.client_limit
    }

    pub fn on_disconnect(&self, conn: SubscriberId) {
        info!("BLE: central disconnected (conn_id={conn})");
        self.link.on_disconnect(conn);
        self.server.on_subscribe(conn, false);
    }

    pub fn on_mtu(&self, conn: SubscriberId, mtu: u16) {
        info!("BLE: MTU {mtu} (conn_id={conn})");
        self.link.on_mtu(conn, mtu);
    }

    pub fn on_congest(&self, conn: SubscriberId, congested: bool) {
        self.link.on_congest(conn, congested);
    }

    /// Dispatch a client write. Returns the records to send back on the
    /// LED info characteristic (empty for every other attribute).
    pub fn on_write(&self, conn: SubscriberId, handle: u16, data: &[u8]) -> Vec<Vec<u8>> {
        match self.with_routes(|r| r.role_of(handle)) {
            Some(Role::Gui) => self.server.on_incoming_message(data),
            Some(Role::GuiCccd) => self.server.on_subscribe(conn, cccd_enabled(data)),
            Some(Role::LedInfo) => return self.leds.handle_info_request(data),
            Some(Role::Led(id)) => {
                self.leds.on_color_write(&id, data);
            }
            Some(Role::ModelName | Role::LedInfoCccd) => {}
            None => debug!("BLE: write to unknown handle {handle}"),
        }
        Vec::new()
    }
}

static ROUTER: OnceLock<Router<BluedroidTransport>> = OnceLock::new();

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

pub struct BleRemote {
    state: BleState,
    device_name: Name,
}

impl BleRemote {
    pub fn new(config: &GuiConfig) -> Self {
        Self {
            state: BleState::Idle,
            device_name: config.device_name.clone(),
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Bind `router` to the stack callbacks and start advertising. The
    /// binding lasts for the life of the process.
    pub fn start(&mut self, router: Router<BluedroidTransport>) -> Result<(), Error> {
        if ROUTER.set(router).is_err() {
            return Err(Error::Init("BLE stack already bound"));
        }
        info!("BLE: starting advertising as '{}'", self.device_name);
        match platform::start(&self.device_name) {
            Ok(()) => {
                self.state = BleState::Advertising;
                Ok(())
            }
            Err(e) => {
                self.state = BleState::Failed;
                Err(e)
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(router) = ROUTER.get() {
            router.server().shutdown();
        }
        platform::stop();
        self.state = BleState::Idle;
        info!("BLE: stopped");
    }
}

// ───────────────────────────────────────────────────────────────
// Platform
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use std::ffi::CString;
    use std::sync::atomic::{AtomicU8, AtomicU16, Ordering};

    use esp_idf_svc::sys::*;
    use log::{error, info, warn};

    use super::{CCCD_UUID, ROUTER, Role, SERVICE_UUID};
    use crate::error::Error;
    use crate::identifier::Uuid;

    const ADV_CONFIG_FLAG: u8 = 1 << 0;
    const SCAN_RSP_CONFIG_FLAG: u8 = 1 << 1;

    static SVC_HANDLE: AtomicU16 = AtomicU16::new(0);
    static ADV_CONFIG_PENDING: AtomicU8 = AtomicU8::new(0);

    fn uuid128_to_esp(uuid: Uuid) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_128 as u16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    fn uuid16_to_esp(uuid: u16) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_16 as u16;
        t.uuid.uuid16 = uuid;
        t
    }

    fn adv_params() -> esp_ble_adv_params_t {
        esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        }
    }

    fn start_advertising() {
        let mut params = adv_params();
        let ret = unsafe { esp_ble_gap_start_advertising(&mut params) };
        if ret != ESP_OK as i32 {
            warn!("BLE GAP: start advertising failed ({ret})");
        }
    }

    /// Advertising packet carries the service UUID, the scan response the
    /// device name; both must fit in 31 bytes.
    fn configure_advertising() {
        let mut uuid = Uuid::from_u128(SERVICE_UUID).to_le_bytes();
        let mut adv = esp_ble_adv_data_t {
            set_scan_rsp: false,
            include_name: false,
            service_uuid_len: uuid.len() as u16,
            p_service_uuid: uuid.as_mut_ptr(),
            flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
            ..unsafe { core::mem::zeroed() }
        };
        let mut scan_rsp = esp_ble_adv_data_t {
            set_scan_rsp: true,
            include_name: true,
            ..unsafe { core::mem::zeroed() }
        };
        ADV_CONFIG_PENDING.store(ADV_CONFIG_FLAG | SCAN_RSP_CONFIG_FLAG, Ordering::Relaxed);
        unsafe {
            esp_ble_gap_config_adv_data(&mut adv);
            esp_ble_gap_config_adv_data(&mut scan_rsp);
        }
    }

    fn adv_config_done(flag: u8) {
        let before = ADV_CONFIG_PENDING.fetch_and(!flag, Ordering::Relaxed);
        if before & !flag == 0 {
            start_advertising();
        }
    }

    /// Issue the add call for `role`; the stack answers with an
    /// ADD_CHAR / ADD_CHAR_DESCR event.
    fn add_attribute(svc_handle: u16, role: Role, model_name: &str) {
        let mut model = model_name.as_bytes().to_vec();
        let ret = unsafe {
            if role.is_descriptor() {
                let mut uuid = uuid16_to_esp(CCCD_UUID);
                esp_ble_gatts_add_char_descr(
                    svc_handle,
                    &mut uuid,
                    (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                )
            } else {
                let Some(id) = role.uuid() else {
                    return;
                };
                let mut uuid = uuid128_to_esp(id);
                match role {
                    Role::ModelName => {
                        let mut value = esp_attr_value_t {
                            attr_max_len: model.len() as u16,
                            attr_len: model.len() as u16,
                            attr_value: model.as_mut_ptr(),
                        };
                        let mut control = esp_attr_control_t {
                            auto_rsp: ESP_GATT_AUTO_RSP as u8,
                        };
                        esp_ble_gatts_add_char(
                            svc_handle,
                            &mut uuid,
                            ESP_GATT_PERM_READ as esp_gatt_perm_t,
                            ESP_GATT_CHAR_PROP_BIT_READ as esp_gatt_char_prop_t,
                            &mut value,
                            &mut control,
                        )
                    }
                    Role::LedInfo | Role::Gui => esp_ble_gatts_add_char(
                        svc_handle,
                        &mut uuid,
                        ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
                        (ESP_GATT_CHAR_PROP_BIT_WRITE
                            | ESP_GATT_CHAR_PROP_BIT_WRITE_NR
                            | ESP_GATT_CHAR_PROP_BIT_NOTIFY) as esp_gatt_char_prop_t,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    ),
                    _ => esp_ble_gatts_add_char(
                        svc_handle,
                        &mut uuid,
                        ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
                        (ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR)
                            as esp_gatt_char_prop_t,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    ),
                }
            }
        };
        if ret != ESP_OK as i32 {
            warn!("BLE GATTS: add {role:?} failed ({ret})");
        }
    }

    fn register_next(svc_handle: u16) {
        let Some(router) = ROUTER.get() else {
            return;
        };
        match router.register_next() {
            Some(role) => add_attribute(svc_handle, role, router.model_name()),
            None if router.with_routes(|r| r.is_complete()) => {
                info!("BLE GATTS: all attributes registered");
            }
            None => {}
        }
    }

    unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
                adv_config_done(ADV_CONFIG_FLAG);
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
                adv_config_done(SCAN_RSP_CONFIG_FLAG);
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                info!("BLE GAP: advertising started");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("BLE GAP: advertising stopped");
            }
            _ => {}
        }
    }

    unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        let Some(router) = ROUTER.get() else {
            return;
        };

        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                info!("BLE GATTS: app registered (if={gatts_if})");
                router.on_app_registered(gatts_if);
                configure_advertising();
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(Uuid::from_u128(SERVICE_UUID)),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                let handles = router.with_routes(|r| r.handle_count());
                unsafe {
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, handles);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let p = unsafe { &(*param).create };
                SVC_HANDLE.store(p.service_handle, Ordering::Relaxed);
                info!("BLE GATTS: service created (handle={})", p.service_handle);
                unsafe {
                    esp_ble_gatts_start_service(p.service_handle);
                }
                register_next(p.service_handle);
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT
            | esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                let (status, handle) = unsafe {
                    if event == esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT {
                        ((*param).add_char.status, (*param).add_char.attr_handle)
                    } else {
                        ((*param).add_char_descr.status, (*param).add_char_descr.attr_handle)
                    }
                };
                if status != esp_gatt_status_t_ESP_GATT_OK {
                    error!("BLE GATTS: attribute registration failed (status={status})");
                }
                router.on_registered(handle);
                register_next(SVC_HANDLE.load(Ordering::Relaxed));
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                if router.on_connect(p.conn_id) {
                    start_advertising();
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                let p = unsafe { &(*param).disconnect };
                router.on_disconnect(p.conn_id);
                start_advertising();
            }
            esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                let p = unsafe { &(*param).mtu };
                router.on_mtu(p.conn_id, p.mtu);
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONGEST_EVT => {
                let p = unsafe { &(*param).congest };
                router.on_congest(p.conn_id, p.congested);
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &(*param).write };
                if p.need_rsp {
                    unsafe {
                        esp_ble_gatts_send_response(
                            gatts_if,
                            p.conn_id,
                            p.trans_id,
                            esp_gatt_status_t_ESP_GATT_OK,
                            core::ptr::null_mut(),
                        );
                    }
                }
                if p.is_prep {
                    warn!("BLE GATTS: prepared writes are not supported");
                    return;
                }
                let data = if p.value.is_null() {
                    &[][..]
                } else {
                    unsafe { core::slice::from_raw_parts(p.value, p.len as usize) }
                };
                let replies = router.on_write(p.conn_id, p.handle, data);
                if replies.is_empty() {
                    return;
                }
                let Some(info) = router.with_routes(|r| r.handle_of(Role::LedInfo)) else {
                    return;
                };
                for record in &replies {
                    if let Err(e) = router.link().indicate(p.conn_id, info, record) {
                        warn!("BLE GATTS: info reply failed: {e}");
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    pub(super) fn start(device_name: &str) -> Result<(), Error> {
        let name = CString::new(device_name).map_err(|_| Error::Init("device name contains NUL"))?;
        unsafe {
            // BLE-only: hand classic BT memory back to the heap.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            if esp_bt_controller_init(&mut bt_cfg) != ESP_OK as i32 {
                return Err(Error::Init("bt_controller_init failed"));
            }
            if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK as i32 {
                return Err(Error::Init("bt_controller_enable failed"));
            }
            if esp_bluedroid_init() != ESP_OK as i32 {
                return Err(Error::Init("bluedroid_init failed"));
            }
            if esp_bluedroid_enable() != ESP_OK as i32 {
                return Err(Error::Init("bluedroid_enable failed"));
            }

            esp_ble_gap_register_callback(Some(gap_event_handler));
            esp_ble_gatts_register_callback(Some(gatts_event_handler));
            esp_ble_gap_set_device_name(name.as_ptr());
            if esp_ble_gatts_app_register(0) != ESP_OK as i32 {
                return Err(Error::Init("gatts_app_register failed"));
            }
        }
        info!("BLE(espidf): Bluedroid stack initialized as '{device_name}'");
        Ok(())
    }

    pub(super) fn stop() {
        unsafe {
            esp_ble_gap_stop_advertising();
            esp_bluedroid_disable();
            esp_bluedroid_deinit();
            esp_bt_controller_disable();
            esp_bt_controller_deinit();
        }
        info!("BLE(espidf): stack shut down");
    }
}

#[cfg(not(target_os = "espidf"))]
mod platform {
    use log::info;

    use super::SERVICE_UUID;
    use crate::error::Error;

    #[allow(clippy::unnecessary_wraps)]
    pub(super) fn start(device_name: &str) -> Result<(), Error> {
        info!("BLE(sim): advertising '{device_name}' (service {SERVICE_UUID:032x})");
        Ok(())
    }

    pub(super) fn stop() {
        info!("BLE(sim): stopped");
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
