use crate::define_id_newtype;

define_id_newtype!(OrderId, u64);
define_id_newtype!(ShopId, u64);
define_id_newtype!(CourierId, u64);
define_id_newtype!(VehicleTypeId, u32);
