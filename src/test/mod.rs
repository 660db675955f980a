mod device;
mod queues;
mod sim_time;
mod wifi_mac_queue;
